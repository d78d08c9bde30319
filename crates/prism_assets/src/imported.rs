//! Records produced by a [`SceneSource`](crate::SceneSource).
//!
//! They mirror what a general purpose importer hands back: meshes with
//! per-bone weight lists, materials as loose property bags, textures either
//! compressed or raw, a node tree, and keyframed animations keyed by node
//! name. Nothing here is render-ready; the mesh builder, the material builder
//! and the scene loader convert them.

use glam::{DMat4, Quat, Vec3};

#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    pub textures: Vec<ImportedTexture>,
    pub nodes: Vec<ImportedNode>,
    pub root: usize,
    pub animations: Vec<ImportedAnimation>,
}

impl ImportedScene {
    pub fn root_node(&self) -> Option<&ImportedNode> {
        self.nodes.get(self.root)
    }
}

#[derive(Debug, Clone)]
pub struct ImportedNode {
    pub name: String,
    pub transform: DMat4,
    pub meshes: Vec<usize>,
    pub children: Vec<usize>,
}

impl ImportedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: DMat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TexCoordChannel {
    /// 1, 2 or 3. Only 2-component channels are used for rendering.
    pub components: u32,
    pub coords: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub struct ImportedBone {
    pub name: String,
    /// Mesh space -> bone space at rest, used as the inverse bind matrix.
    pub offset_matrix: DMat4,
    pub weights: Vec<VertexWeight>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Vec<TexCoordChannel>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub colors: Vec<Vec<[f32; 4]>>,
    pub faces: Vec<Vec<u32>>,
    pub bones: Vec<ImportedBone>,
    pub material_index: usize,
}

/// Shading model as declared by the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingModel {
    Flat,
    Gouraud,
    Phong,
    Blinn,
    Toon,
    OrenNayar,
    Minnaert,
    CookTorrance,
    NoShading,
    Fresnel,
    PbrBrdf,
    Unknown(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureRole {
    Diffuse,
    Normal,
    BaseColor,
    Emissive,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedMaterial {
    pub name: String,
    pub shading_model: Option<ShadingModel>,
    pub opacity: Option<f32>,
    pub diffuse: Option<[f32; 4]>,
    pub specular: Option<[f32; 4]>,
    pub ambient: Option<[f32; 4]>,
    /// Texture references: `*N` for embedded index N, else a file name.
    pub textures: Vec<(TextureRole, String)>,
}

#[derive(Debug, Clone)]
pub enum TextureContent {
    /// Encoded image bytes plus a short format hint such as `png` or `jpg`.
    Compressed { data: Vec<u8>, format_hint: String },
    /// Uncompressed RGBA8 texels, `width * height * 4` bytes.
    Raw {
        width: u32,
        height: u32,
        texels: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct ImportedTexture {
    pub filename: Option<String>,
    pub content: TextureContent,
}

/// Sampling policy outside of a track's key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimBehaviour {
    /// Same as `Constant`.
    #[default]
    Default,
    Constant,
    Linear,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key<T> {
    pub time: f64,
    pub value: T,
}

impl<T> Key<T> {
    pub fn new(time: f64, value: T) -> Self {
        Self { time, value }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportedChannel {
    pub node_name: String,
    pub position_keys: Vec<Key<Vec3>>,
    pub rotation_keys: Vec<Key<Quat>>,
    pub scaling_keys: Vec<Key<Vec3>>,
    pub pre_state: AnimBehaviour,
    pub post_state: AnimBehaviour,
}

impl ImportedChannel {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportedAnimation {
    pub name: String,
    /// 0 means the source did not say; callers substitute a frame rate.
    pub ticks_per_second: f64,
    pub duration: f64,
    pub channels: Vec<ImportedChannel>,
}
