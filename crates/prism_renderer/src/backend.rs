use std::collections::HashMap;

use log::{debug, info};
use prism_assets::{GeometryData, Handle, MaterialData};

use crate::{
    JOINT_MATRICES_UNIFORM, RenderBackend,
    drawable::{Drawable, DrawableId},
    material::GpuMaterialUniform,
    mesh::{MeshBuffers, MeshUniform},
};

/// Counters for one staged frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawables: usize,
    pub triangles: usize,
    pub joint_matrices: usize,
    pub uniform_bytes: usize,
}

struct StagedDrawable {
    geometry: Handle<GeometryData>,
    material: Option<usize>,
}

/// Backend that prepares everything a GPU upload would need and keeps it
/// in memory.
///
/// Geometry buffers are built once per geometry handle and shared between
/// drawables. Per-frame data (model matrices, joint palettes) is packed
/// again on every [`frame`](Self::frame).
#[derive(Default)]
pub struct StagingBackend {
    meshes: HashMap<Handle<GeometryData>, MeshBuffers>,
    materials: Vec<GpuMaterialUniform>,
    material_slots: HashMap<Handle<MaterialData>, usize>,
    drawables: Vec<(DrawableId, StagedDrawable)>,
    frame_bytes: Vec<u8>,
}

impl StagingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn mesh_buffers(&self, geometry: Handle<GeometryData>) -> Option<&MeshBuffers> {
        self.meshes.get(&geometry)
    }

    pub fn material_uniform(&self, material: Handle<MaterialData>) -> Option<&GpuMaterialUniform> {
        self.material_slots
            .get(&material)
            .map(|slot| &self.materials[*slot])
    }

    /// Bytes written by the last [`frame`](Self::frame) call.
    pub fn frame_bytes(&self) -> &[u8] {
        &self.frame_bytes
    }

    /// Packs the per-frame uniforms of every registered drawable.
    ///
    /// `drawables` is the scene's drawable table, indexed by [`DrawableId`].
    pub fn frame(&mut self, drawables: &[Drawable]) -> FrameStats {
        self.frame_bytes.clear();
        let mut stats = FrameStats::default();

        for (id, staged) in &self.drawables {
            let Some(drawable) = drawables.get(id.0) else {
                continue;
            };

            let uniform = MeshUniform::from_matrix(&drawable.user_matrix);
            self.frame_bytes
                .extend_from_slice(bytemuck::bytes_of(&uniform));

            if let Some(palette) = drawable.vertex_uniforms.mat4_array(JOINT_MATRICES_UNIFORM) {
                self.frame_bytes
                    .extend_from_slice(bytemuck::cast_slice(palette));
                stats.joint_matrices += palette.len();
            }
            if let Some(slot) = staged.material {
                self.frame_bytes
                    .extend_from_slice(bytemuck::bytes_of(&self.materials[slot]));
            }

            stats.drawables += 1;
            stats.triangles += self
                .meshes
                .get(&staged.geometry)
                .map_or(0, MeshBuffers::triangle_count);
        }

        stats.uniform_bytes = self.frame_bytes.len();
        stats
    }
}

impl RenderBackend for StagingBackend {
    fn add_drawable(
        &mut self,
        id: DrawableId,
        drawable: &Drawable,
        geometry: &GeometryData,
        material: Option<&MaterialData>,
    ) {
        self.meshes.entry(drawable.geometry).or_insert_with(|| {
            let buffers = MeshBuffers::from_geometry(geometry);
            debug!(
                "Staged geometry '{}': {} vertices, {} triangles",
                geometry.name,
                buffers.vertices.len(),
                buffers.triangle_count()
            );
            buffers
        });

        let material = match (drawable.material, material) {
            (Some(handle), Some(data)) => {
                let next = self.materials.len();
                let slot = *self.material_slots.entry(handle).or_insert(next);
                if slot == next {
                    self.materials.push(GpuMaterialUniform::from(data));
                }
                Some(slot)
            }
            _ => None,
        };

        self.drawables.push((
            id,
            StagedDrawable {
                geometry: drawable.geometry,
                material,
            },
        ));
    }

    fn release_graphics_resources(&mut self) {
        info!(
            "Releasing {} staged meshes and {} materials",
            self.meshes.len(),
            self.materials.len()
        );
        self.meshes.clear();
        self.materials.clear();
        self.material_slots.clear();
        self.drawables.clear();
        self.frame_bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use glam::DMat4;

    use super::*;

    fn triangle() -> GeometryData {
        GeometryData {
            name: "tri".into(),
            positions: vec![[0.0; 3]; 3],
            polys: vec![vec![0, 1, 2]],
            ..Default::default()
        }
    }

    #[test]
    fn shared_geometry_is_staged_once() {
        let geometry = triangle();
        let material = MaterialData::default();
        let mut backend = StagingBackend::new();

        let a = Drawable::new(Handle::new(0), Some(Handle::new(0)), DMat4::IDENTITY);
        let b = Drawable::new(Handle::new(0), Some(Handle::new(0)), DMat4::IDENTITY);
        backend.add_drawable(DrawableId(0), &a, &geometry, Some(&material));
        backend.add_drawable(DrawableId(1), &b, &geometry, Some(&material));

        assert_eq!(backend.drawable_count(), 2);
        assert_eq!(backend.meshes.len(), 1);
        assert_eq!(backend.materials.len(), 1);

        let stats = backend.frame(&[a, b]);
        assert_eq!(stats.drawables, 2);
        assert_eq!(stats.triangles, 2);
        assert_eq!(
            stats.uniform_bytes,
            2 * (std::mem::size_of::<MeshUniform>() + std::mem::size_of::<GpuMaterialUniform>())
        );
    }

    #[test]
    fn joint_palettes_are_counted() {
        let geometry = triangle();
        let mut backend = StagingBackend::new();
        let mut d = Drawable::new(Handle::new(0), None, DMat4::IDENTITY);
        d.vertex_uniforms
            .set_matrix4x4v(JOINT_MATRICES_UNIFORM, &[DMat4::IDENTITY; 3]);
        backend.add_drawable(DrawableId(0), &d, &geometry, None);

        let stats = backend.frame(std::slice::from_ref(&d));
        assert_eq!(stats.joint_matrices, 3);

        backend.release_graphics_resources();
        assert_eq!(backend.drawable_count(), 0);
        assert_eq!(backend.frame(&[d]).drawables, 0);
    }
}
