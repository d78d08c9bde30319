use prism_assets::ImportError;
use thiserror::Error;

pub mod animation;
pub mod importer;
pub mod node_graph;
pub mod skinning;
pub mod store;

pub use animation::{Clip, Extrapolation, Track};
pub use importer::{ImporterState, SceneImporter, TemporalInfo};
pub use store::{NodeId, SceneNode, SceneStore};

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("importer is {found:?}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        found: ImporterState,
    },

    #[error("animation index {index} out of range ({count} animations)")]
    AnimationIndex { index: usize, count: usize },

    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),

    #[error("no file name set")]
    NoSource,
}

pub type Result<T> = std::result::Result<T, SceneError>;
