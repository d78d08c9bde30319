use bytemuck::{Pod, Zeroable};
use glam::{DMat4, Mat4};
use prism_assets::GeometryData;

// #[repr(C)] ensures the compiler doesn't reorder fields.
// Pod (Plain Old Data) and Zeroable allow us to cast this struct to raw bytes safely.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshUniform {
    // Model -> world
    pub model: Mat4,
    // Transpose(Inverse(Model)), keeps normals perpendicular under non-uniform scale
    pub normal_matrix: Mat4,
}

impl MeshUniform {
    pub fn from_matrix(model: &DMat4) -> Self {
        let normal_matrix = prism_core::try_invert(model)
            .map(|inv| inv.transpose())
            .unwrap_or(DMat4::IDENTITY);

        Self {
            model: model.as_mat4(),
            normal_matrix: normal_matrix.as_mat4(),
        }
    }
}

// The GPU-compatible vertex, skinning attributes included.
// Rigid geometry carries zero weights.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

/// CPU copy of what gets uploaded for one geometry.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    pub vertices: Vec<Vertex>,
    pub triangle_indices: Vec<u32>,
    pub line_indices: Vec<u32>,
    pub point_indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn from_geometry(geometry: &GeometryData) -> Self {
        let count = geometry.vertex_count();
        let skin = geometry.skin.as_ref();

        let vertices = (0..count)
            .map(|i| Vertex {
                position: geometry.positions[i],
                normal: geometry
                    .normals
                    .as_ref()
                    .map_or([0.0, 1.0, 0.0], |n| n[i]),
                uv: geometry.uvs.as_ref().map_or([0.0, 0.0], |t| t[i]),
                color: geometry.colors.as_ref().map_or([1.0; 4], |c| c[i]),
                joints: skin.map_or([0; 4], |s| s.joint_indices[i]),
                weights: skin.map_or([0.0; 4], |s| s.joint_weights[i]),
            })
            .collect();

        // Polygons are convex after import, a fan is enough
        let mut triangle_indices = Vec::new();
        for poly in &geometry.polys {
            for k in 1..poly.len().saturating_sub(1) {
                triangle_indices.extend_from_slice(&[poly[0], poly[k], poly[k + 1]]);
            }
        }

        Self {
            vertices,
            triangle_indices,
            line_indices: geometry.lines.iter().flatten().copied().collect(),
            point_indices: geometry.verts.clone(),
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }
}
