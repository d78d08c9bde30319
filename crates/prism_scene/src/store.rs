use std::{collections::HashMap, path::Path};

use glam::DMat4;
use log::{debug, info, warn};
use prism_assets::{
    GeometryData, Handle, ImportError, MaterialData, TextureData, TextureResolver,
    build_geometry, build_material, imported::ImportedScene,
};
use prism_core::Transform;
use prism_renderer::{Drawable, DrawableId};

use crate::{animation::Clip, node_graph};

/// Index of a node in the preorder node array. The root is always `NodeId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Geometry indices instanced on this node.
    pub meshes: Vec<usize>,
    /// Import-time local transform, split into TRS.
    pub rest: Transform,
    /// Import-time local matrix, exactly as read.
    pub rest_local: DMat4,
    pub local: DMat4,
    pub global: DMat4,
    pub drawables: Vec<DrawableId>,
}

/// Owns everything read from one file plus the per-frame derived state.
///
/// Geometries, materials and textures never change after import. Node
/// matrices are written by the animation and graph passes, joint uniforms by
/// the skinning pass.
#[derive(Debug, Default)]
pub struct SceneStore {
    pub(crate) nodes: Vec<SceneNode>,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) geometries: Vec<GeometryData>,
    pub(crate) materials: Vec<MaterialData>,
    pub(crate) textures: Vec<TextureData>,
    pub(crate) embedded: Vec<Option<TextureData>>,
    pub(crate) clips: Vec<Clip>,
    pub(crate) drawables: Vec<Drawable>,
    /// Per geometry, the node driving each bone, in bone order.
    pub(crate) skin_bindings: Vec<Vec<Option<NodeId>>>,
}

impl SceneStore {
    /// Builds the store from importer records.
    ///
    /// Only structural problems (dangling indices, cycles) fail; everything
    /// else is logged and skipped.
    pub fn from_imported(scene: &ImportedScene, asset_path: &Path) -> Result<Self, ImportError> {
        // STEP 1: Node tree, flattened in preorder
        let nodes = node_graph::flatten(scene)?;
        let names = index_names(&nodes);

        // STEP 2: Geometry
        let geometries: Vec<GeometryData> = scene.meshes.iter().map(build_geometry).collect();
        for node in &nodes {
            if let Some(bad) = node.meshes.iter().find(|m| **m >= geometries.len()) {
                return Err(ImportError::InvalidInput(format!(
                    "node '{}' references mesh {bad}, file has {}",
                    node.name,
                    geometries.len()
                )));
            }
        }

        // STEP 3: Materials and textures, one material per source material
        let resolver = TextureResolver::new(asset_path, &scene.textures);
        let mut textures = Vec::new();
        let materials: Vec<MaterialData> = scene
            .materials
            .iter()
            .map(|m| build_material(m, &resolver, &mut textures))
            .collect();
        let embedded = resolver.embedded().map(|t| t.cloned()).collect();

        // STEP 4: Bone and channel names -> node ids
        let skin_bindings = geometries
            .iter()
            .map(|g| {
                g.bones()
                    .iter()
                    .map(|bone| {
                        let id = names.get(bone).copied();
                        if id.is_none() {
                            warn!("Geometry '{}': bone '{bone}' matches no node", g.name);
                        }
                        id
                    })
                    .collect()
            })
            .collect();

        let clips = scene
            .animations
            .iter()
            .map(|a| Clip::resolve(a, &names))
            .collect();

        info!(
            "Scene: {} nodes, {} geometries, {} materials, {} textures",
            nodes.len(),
            geometries.len(),
            materials.len(),
            textures.len()
        );

        let mut store = Self {
            nodes,
            names,
            geometries,
            materials,
            textures,
            embedded,
            clips,
            drawables: Vec::new(),
            skin_bindings,
        };
        node_graph::propagate(&mut store.nodes);
        Ok(store)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn root(&self) -> Option<&SceneNode> {
        self.node(NodeId::ROOT)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.node_id(name).and_then(|id| self.node(id))
    }

    pub fn local(&self, name: &str) -> Option<DMat4> {
        self.node_by_name(name).map(|n| n.local)
    }

    pub fn global(&self, name: &str) -> Option<DMat4> {
        self.node_by_name(name).map(|n| n.global)
    }

    pub fn drawable_set(&self, name: &str) -> Option<&[DrawableId]> {
        self.node_by_name(name).map(|n| n.drawables.as_slice())
    }

    pub fn geometries(&self) -> &[GeometryData] {
        &self.geometries
    }

    pub fn geometry(&self, handle: Handle<GeometryData>) -> Option<&GeometryData> {
        self.geometries.get(handle.index)
    }

    pub fn materials(&self) -> &[MaterialData] {
        &self.materials
    }

    pub fn material(&self, handle: Handle<MaterialData>) -> Option<&MaterialData> {
        self.materials.get(handle.index)
    }

    pub fn texture(&self, handle: Handle<TextureData>) -> Option<&TextureData> {
        self.textures.get(handle.index)
    }

    /// Decoded embedded texture `*index`, `None` if it failed to decode.
    pub fn embedded_texture(&self, index: usize) -> Option<&TextureData> {
        self.embedded.get(index).and_then(Option::as_ref)
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// All drawables, in the order they were created.
    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn drawable(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(id.0)
    }

    /// Node ids driving each bone of `geometry`, in bone order.
    pub fn skin_binding(&self, geometry: Handle<GeometryData>) -> &[Option<NodeId>] {
        self.skin_bindings
            .get(geometry.index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// First occurrence wins, later duplicates stay reachable by id only
fn index_names(nodes: &[SceneNode]) -> HashMap<String, NodeId> {
    let mut names = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if names.contains_key(&node.name) {
            warn!("Duplicate node name '{}', lookups by name resolve to the first", node.name);
            continue;
        }
        names.insert(node.name.clone(), NodeId(i));
    }
    debug!("Indexed {} node names", names.len());
    names
}

#[cfg(test)]
mod tests {
    use prism_assets::imported::{ImportedMesh, ImportedNode};

    use super::*;

    fn two_level() -> ImportedScene {
        let mut root = ImportedNode::new("root");
        root.children = vec![1, 2];
        let mut a = ImportedNode::new("dup");
        a.meshes = vec![0];
        let b = ImportedNode::new("dup");
        ImportedScene {
            meshes: vec![ImportedMesh {
                positions: vec![[0.0; 3]; 3],
                faces: vec![vec![0, 1, 2]],
                ..Default::default()
            }],
            nodes: vec![root, a, b],
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_names_resolve_to_first_node() {
        let store = SceneStore::from_imported(&two_level(), Path::new("mem.gltf")).unwrap();
        assert_eq!(store.node_id("dup"), Some(NodeId(1)));
        assert_eq!(store.nodes().len(), 3);
        assert_eq!(store.node(NodeId(2)).unwrap().name, "dup");
    }

    #[test]
    fn dangling_mesh_reference_is_invalid_input() {
        let mut scene = two_level();
        scene.nodes[2].meshes = vec![5];
        assert!(matches!(
            SceneStore::from_imported(&scene, Path::new("mem.gltf")),
            Err(ImportError::InvalidInput(_))
        ));
    }
}
