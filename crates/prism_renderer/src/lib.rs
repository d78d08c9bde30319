use prism_assets::{GeometryData, MaterialData};

pub mod backend;
pub mod drawable;
pub mod material;
pub mod mesh;

pub use backend::{FrameStats, StagingBackend};
pub use drawable::{Drawable, DrawableId, UniformValue, Uniforms};

/// Name of the vertex-shader uniform holding the packed joint matrices.
pub const JOINT_MATRICES_UNIFORM: &str = "jointMatrices";

/// What the scene needs from a renderer.
///
/// Drawables stay owned by the scene; a backend is told about each one once,
/// when it is created, and reads their matrices and uniforms at draw time.
pub trait RenderBackend {
    fn add_drawable(
        &mut self,
        id: DrawableId,
        drawable: &Drawable,
        geometry: &GeometryData,
        material: Option<&MaterialData>,
    );

    /// Drops every GPU-side resource created so far.
    fn release_graphics_resources(&mut self);
}
