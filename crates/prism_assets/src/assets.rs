use std::{cmp::Ordering, fmt, marker::PhantomData};
use std::hash::{Hash, Hasher};

use glam::DMat4;

// Typed index into one of the scene tables (geometries, materials, textures).
// Just a number. Efficient to copy.
pub struct Handle<T> {
    pub index: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

// Implemented by hand so T does not need to be Hash
impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Maximum number of bone influences stored per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Skinning attributes of a geometry.
///
/// `bones[i]` names the node driving joint `i`, `inverse_bind[i]` is its
/// inverse bind matrix, and `joint_indices` index into that same order.
#[derive(Debug, Clone, Default)]
pub struct SkinData {
    pub bones: Vec<String>,
    pub inverse_bind: Vec<DMat4>,
    pub joint_indices: Vec<[u16; MAX_INFLUENCES]>,
    pub joint_weights: Vec<[f32; MAX_INFLUENCES]>,
}

impl SkinData {
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

/// Render-ready geometry. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub colors: Option<Vec<[f32; 4]>>,

    // Topology buckets
    pub verts: Vec<u32>,
    pub lines: Vec<[u32; 2]>,
    pub polys: Vec<Vec<u32>>,

    pub skin: Option<SkinData>,
    pub material_index: usize,
}

impl GeometryData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Bone names, empty for rigid geometry.
    pub fn bones(&self) -> &[String] {
        self.skin.as_ref().map(|s| s.bones.as_slice()).unwrap_or(&[])
    }

    pub fn is_skinned(&self) -> bool {
        !self.bones().is_empty()
    }
}
