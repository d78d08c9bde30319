use std::path::Path;

use crate::{Result, imported::ImportedScene};

mod gltf_parser;

pub use gltf_parser::parse_gltf;

/// Reads a model file into importer records.
pub trait SceneSource {
    fn read(&self, path: &Path) -> Result<ImportedScene>;

    /// Whether this source handles files with the given extension.
    fn supports(&self, path: &Path) -> bool;
}

/// glTF 2.0 (`.gltf` and `.glb`).
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfSource;

impl SceneSource for GltfSource {
    fn read(&self, path: &Path) -> Result<ImportedScene> {
        parse_gltf(path)
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gltf") || e.eq_ignore_ascii_case("glb"))
    }
}
