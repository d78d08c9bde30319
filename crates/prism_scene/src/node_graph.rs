//! Node hierarchy: flattening, global matrices and drawable instancing.
//!
//! Nodes live in one array in preorder, so every parent sits before its
//! children and a single forward pass computes all globals.

use glam::DMat4;
use log::{debug, trace, warn};
use prism_assets::{Handle, ImportError, imported::ImportedScene};
use prism_core::{Transform, compose};
use prism_renderer::{Drawable, DrawableId, RenderBackend};

use crate::store::{NodeId, SceneNode, SceneStore};

/// Flattens the imported tree into preorder, starting at the root.
///
/// A child index out of range or a node reachable twice (shared subtree or
/// cycle) makes the file invalid.
pub fn flatten(scene: &ImportedScene) -> Result<Vec<SceneNode>, ImportError> {
    if scene.root_node().is_none() {
        return Err(ImportError::InvalidInput(format!(
            "root node {} missing ({} nodes)",
            scene.root,
            scene.nodes.len()
        )));
    }

    let mut visited = vec![false; scene.nodes.len()];
    let mut nodes: Vec<SceneNode> = Vec::with_capacity(scene.nodes.len());
    let mut stack: Vec<(usize, Option<NodeId>)> = vec![(scene.root, None)];

    while let Some((index, parent)) = stack.pop() {
        let Some(source) = scene.nodes.get(index) else {
            return Err(ImportError::InvalidInput(format!(
                "child index {index} out of range ({} nodes)",
                scene.nodes.len()
            )));
        };
        if std::mem::replace(&mut visited[index], true) {
            return Err(ImportError::InvalidInput(format!(
                "node '{}' is reachable more than once",
                source.name
            )));
        }

        let id = NodeId(nodes.len());
        if let Some(p) = parent {
            nodes[p.0].children.push(id);
        }
        nodes.push(SceneNode {
            name: source.name.clone(),
            parent,
            children: Vec::with_capacity(source.children.len()),
            meshes: source.meshes.clone(),
            rest: Transform::from_matrix(&source.transform),
            rest_local: source.transform,
            local: source.transform,
            global: DMat4::IDENTITY,
            drawables: Vec::new(),
        });

        // Reversed so the first child is popped first
        stack.extend(source.children.iter().rev().map(|c| (*c, Some(id))));
    }

    let unreachable = visited.iter().filter(|v| !**v).count();
    if unreachable > 0 {
        debug!("{unreachable} nodes are not reachable from the root and were skipped");
    }
    Ok(nodes)
}

/// Recomputes every global as `parent.global * local`, root parent = identity.
pub fn propagate(nodes: &mut [SceneNode]) {
    for i in 0..nodes.len() {
        let global = match nodes[i].parent {
            Some(p) => compose(&nodes[p.0].global, &nodes[i].local),
            None => compose(&DMat4::IDENTITY, &nodes[i].local),
        };
        nodes[i].global = global;
    }
}

/// Creates one drawable per mesh reference, in preorder, and announces each
/// to `backend`. Any drawables from an earlier call are dropped first.
pub fn instantiate_drawables(store: &mut SceneStore, backend: &mut dyn RenderBackend) {
    store.drawables.clear();

    for node in &mut store.nodes {
        node.drawables.clear();
        for &mesh in &node.meshes {
            let geometry = &store.geometries[mesh];
            let material = if geometry.material_index < store.materials.len() {
                Some(Handle::new(geometry.material_index))
            } else {
                warn!(
                    "Geometry '{}' uses material {}, file has {}",
                    geometry.name,
                    geometry.material_index,
                    store.materials.len()
                );
                None
            };

            let id = DrawableId(store.drawables.len());
            let drawable = Drawable::new(Handle::new(mesh), material, node.global);
            backend.add_drawable(
                id,
                &drawable,
                geometry,
                material.map(|m| &store.materials[m.index]),
            );
            trace!("Node '{}': drawable {} <- geometry {mesh}", node.name, id.0);

            store.drawables.push(drawable);
            node.drawables.push(id);
        }
    }

    debug!("Instantiated {} drawables", store.drawables.len());
}

/// Copies each node's current global into the user matrix of its drawables.
pub fn refresh_user_matrices(store: &mut SceneStore) {
    for node in &store.nodes {
        for id in &node.drawables {
            store.drawables[id.0].user_matrix = node.global;
        }
    }
}
