use log::{debug, warn};

use glam::DMat4;

use crate::{
    ImportError,
    assets::{GeometryData, MAX_INFLUENCES, SkinData},
    imported::ImportedMesh,
};

/// Per-vertex influence accumulator, filled in encounter order.
#[derive(Clone, Copy, Default)]
struct Influences {
    bones: [u16; MAX_INFLUENCES],
    weights: [f32; MAX_INFLUENCES],
    count: usize,
}

impl Influences {
    /// Returns false when the vertex already holds four influences.
    fn push(&mut self, bone: u16, weight: f32) -> bool {
        if self.count >= MAX_INFLUENCES {
            return false;
        }
        self.bones[self.count] = bone;
        self.weights[self.count] = weight;
        self.count += 1;
        true
    }
}

/// Converts an imported mesh into a render-ready geometry record.
///
/// Faces are expected to be triangulated already: one index becomes a point,
/// two a line, anything longer a polygon. Optional attributes are attached
/// only when the source declares them.
pub fn build_geometry(mesh: &ImportedMesh) -> GeometryData {
    let vertex_count = mesh.positions.len();

    let mut geometry = GeometryData {
        name: mesh.name.clone(),
        positions: mesh.positions.clone(),
        material_index: mesh.material_index,
        ..Default::default()
    };

    geometry.normals = mesh
        .normals
        .as_ref()
        .filter(|n| n.len() == vertex_count)
        .cloned();

    // Only the first channel is rendered, and only as 2D coordinates
    geometry.uvs = mesh
        .tex_coords
        .first()
        .filter(|c| c.components == 2 && c.coords.len() == vertex_count)
        .map(|c| c.coords.iter().map(|t| [t[0], t[1]]).collect());

    geometry.tangents = mesh
        .tangents
        .as_ref()
        .filter(|t| t.len() == vertex_count)
        .cloned();

    geometry.colors = mesh
        .colors
        .first()
        .filter(|c| c.len() == vertex_count)
        .cloned();

    for face in &mesh.faces {
        match face.as_slice() {
            [] => {}
            [v] => geometry.verts.push(*v),
            [a, b] => geometry.lines.push([*a, *b]),
            poly => geometry.polys.push(poly.to_vec()),
        }
    }

    if !mesh.bones.is_empty() {
        geometry.skin = Some(build_skin(mesh, vertex_count));
    }

    debug!(
        "Built geometry '{}': {} vertices, {} points, {} lines, {} polygons, {} bones",
        geometry.name,
        vertex_count,
        geometry.verts.len(),
        geometry.lines.len(),
        geometry.polys.len(),
        geometry.bones().len()
    );

    geometry
}

fn build_skin(mesh: &ImportedMesh, vertex_count: usize) -> SkinData {
    let mut influences = vec![Influences::default(); vertex_count];
    let mut dropped = 0usize;

    let mut bones = Vec::with_capacity(mesh.bones.len());
    let mut inverse_bind = Vec::with_capacity(mesh.bones.len());

    for (bone_index, bone) in mesh.bones.iter().enumerate() {
        bones.push(bone.name.clone());
        if bone.offset_matrix.is_finite() {
            inverse_bind.push(bone.offset_matrix);
        } else {
            let e = ImportError::NumericDegenerate(format!("offset matrix of bone '{}'", bone.name));
            warn!("Mesh '{}': {e}, using identity", mesh.name);
            inverse_bind.push(DMat4::IDENTITY);
        }

        let Ok(bone_id) = u16::try_from(bone_index) else {
            warn!("Mesh '{}' has more bones than a joint index can address", mesh.name);
            continue;
        };

        for vw in &bone.weights {
            let Some(slot) = influences.get_mut(vw.vertex as usize) else {
                warn!(
                    "Bone '{}' weights vertex {} outside of mesh '{}'",
                    bone.name, vw.vertex, mesh.name
                );
                continue;
            };
            if !vw.weight.is_finite() {
                warn!(
                    "Bone '{}' has weight {} on vertex {} of '{}', skipped",
                    bone.name, vw.weight, vw.vertex, mesh.name
                );
                continue;
            }
            if !slot.push(bone_id, vw.weight.clamp(0.0, 1.0)) {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        debug!("Dropped {dropped} influences beyond {MAX_INFLUENCES} per vertex in '{}'", mesh.name);
    }

    SkinData {
        bones,
        inverse_bind,
        joint_indices: influences.iter().map(|i| i.bones).collect(),
        joint_weights: influences.iter().map(|i| i.weights).collect(),
    }
}
