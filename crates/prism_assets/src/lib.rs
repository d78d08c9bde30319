use std::path::PathBuf;

use thiserror::Error;

pub mod assets;
pub mod imported;
pub mod material;
pub mod mesh_builder;
pub mod source;
pub mod texture;

pub use assets::{GeometryData, Handle, SkinData};
pub use material::{MaterialData, ShadingMode, TextureSlot, build_material};
pub use mesh_builder::build_geometry;
pub use source::{GltfSource, SceneSource};
pub use texture::{TextureData, TextureResolver};

#[derive(Error, Debug)]
pub enum ImportError {
    /// Unreadable or malformed source. Fatal for the current file.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("missing resource: {}", .0.display())]
    MissingResource(PathBuf),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("degenerate value: {0}")]
    NumericDegenerate(String),
}

pub type Result<T> = std::result::Result<T, ImportError>;
