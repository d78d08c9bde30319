use glam::DMat4;
use log::warn;
use prism_assets::GeometryData;
use prism_core::try_invert;
use prism_renderer::{Drawable, JOINT_MATRICES_UNIFORM};
use rayon::prelude::*;

use crate::store::{NodeId, SceneNode, SceneStore};

/// `rootInverse * global(bone) * inverseBind` for every bone, in bone order.
///
/// Bones that matched no node at import contribute identity.
pub fn joint_matrices(
    nodes: &[SceneNode],
    root_inverse: &DMat4,
    binding: &[Option<NodeId>],
    inverse_bind: &[DMat4],
) -> Vec<DMat4> {
    binding
        .iter()
        .zip(inverse_bind)
        .map(|(node, ibm)| match node {
            Some(id) => *root_inverse * nodes[id.0].global * *ibm,
            None => DMat4::IDENTITY,
        })
        .collect()
}

fn root_inverse(nodes: &[SceneNode]) -> DMat4 {
    let Some(root) = nodes.first() else {
        return DMat4::IDENTITY;
    };
    try_invert(&root.global).unwrap_or_else(|| {
        warn!("Root matrix of '{}' is singular, skinning without it", root.name);
        DMat4::IDENTITY
    })
}

fn skin_drawable(
    drawable: &mut Drawable,
    nodes: &[SceneNode],
    geometries: &[GeometryData],
    bindings: &[Vec<Option<NodeId>>],
    root_inverse: &DMat4,
) {
    let index = drawable.geometry.index;
    let Some(skin) = geometries[index].skin.as_ref() else {
        return;
    };
    if skin.bones.is_empty() {
        return;
    }

    let joints = joint_matrices(nodes, root_inverse, &bindings[index], &skin.inverse_bind);
    drawable
        .vertex_uniforms
        .set_matrix4x4v(JOINT_MATRICES_UNIFORM, &joints);
}

/// Publishes `jointMatrices` on every skinned drawable from the current globals.
pub fn update(store: &mut SceneStore, parallel: bool) {
    let root_inverse = root_inverse(&store.nodes);
    let SceneStore {
        nodes,
        geometries,
        skin_bindings,
        drawables,
        ..
    } = store;
    let (nodes, geometries, skin_bindings) = (&*nodes, &*geometries, &*skin_bindings);

    if parallel {
        drawables.par_iter_mut().for_each(|d| {
            skin_drawable(d, nodes, geometries, skin_bindings, &root_inverse);
        });
    } else {
        for d in drawables.iter_mut() {
            skin_drawable(d, nodes, geometries, skin_bindings, &root_inverse);
        }
    }
}
