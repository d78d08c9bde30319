#![allow(dead_code)]

use std::path::Path;

use glam::{DMat4, DVec3, Quat, Vec3};
use prism_assets::{
    SceneSource,
    imported::{
        ImportedAnimation, ImportedBone, ImportedChannel, ImportedMaterial, ImportedMesh,
        ImportedNode, ImportedScene, Key, VertexWeight,
    },
};
use prism_renderer::{Drawable, JOINT_MATRICES_UNIFORM, StagingBackend};
use prism_scene::SceneImporter;

/// Hands back a fixed scene whatever the path.
pub struct StaticSource(pub ImportedScene);

impl SceneSource for StaticSource {
    fn read(&self, _path: &Path) -> prism_assets::Result<ImportedScene> {
        Ok(self.0.clone())
    }

    fn supports(&self, _path: &Path) -> bool {
        true
    }
}

pub fn load(scene: ImportedScene) -> (SceneImporter, StagingBackend) {
    let mut importer = SceneImporter::with_source(StaticSource(scene));
    importer.set_file_name("/nowhere/scene.gltf");
    importer.begin().unwrap();
    let mut backend = StagingBackend::new();
    importer.import_actors(&mut backend).unwrap();
    (importer, backend)
}

pub fn joints(drawable: &Drawable) -> Vec<DMat4> {
    drawable
        .vertex_uniforms
        .mat4_array(JOINT_MATRICES_UNIFORM)
        .unwrap_or(&[])
        .iter()
        .map(|cols| DMat4::from_cols_array(&cols.map(f64::from)))
        .collect()
}

pub fn assert_mat_eq(a: DMat4, b: DMat4, eps: f64) {
    assert!(a.abs_diff_eq(b, eps), "\n{a:?}\n!=\n{b:?}");
}

pub fn triangle_mesh() -> ImportedMesh {
    ImportedMesh {
        name: "triangle".into(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        faces: vec![vec![0, 1, 2]],
        ..Default::default()
    }
}

pub fn single_node(mesh: Option<ImportedMesh>, channel: ImportedChannel) -> ImportedScene {
    let mut node = ImportedNode::new("node");
    let meshes: Vec<_> = mesh.into_iter().collect();
    if !meshes.is_empty() {
        node.meshes = vec![0];
    }
    ImportedScene {
        meshes,
        materials: vec![ImportedMaterial::default()],
        nodes: vec![node],
        animations: vec![ImportedAnimation {
            name: "clip".into(),
            ticks_per_second: 1.0,
            duration: 1.0,
            channels: vec![channel],
        }],
        ..Default::default()
    }
}

fn translated(name: &str, t: DVec3, children: Vec<usize>) -> ImportedNode {
    let mut node = ImportedNode::new(name);
    node.transform = DMat4::from_translation(t);
    node.children = children;
    node
}

/// root (skinned mesh) -> hip -> knee, root -> prop (rigid mesh).
///
/// The skin lists `knee` before `hip`, and inverse binds are the inverse of
/// each bone's rest matrix relative to the root.
pub fn rig() -> ImportedScene {
    let mut root = translated("root", DVec3::new(0.0, 1.0, 0.0), vec![1, 3]);
    root.meshes = vec![0];
    let hip = translated("hip", DVec3::new(0.0, 1.0, 0.0), vec![2]);
    let knee = translated("knee", DVec3::new(0.0, 1.0, 0.0), vec![]);
    let mut prop = translated("prop", DVec3::new(1.0, 0.0, 0.0), vec![]);
    prop.meshes = vec![1];

    let skinned = ImportedMesh {
        name: "legs".into(),
        bones: vec![
            ImportedBone {
                name: "knee".into(),
                offset_matrix: DMat4::from_translation(DVec3::new(0.0, -2.0, 0.0)),
                weights: vec![
                    VertexWeight { vertex: 0, weight: 1.0 },
                    VertexWeight { vertex: 2, weight: 0.5 },
                ],
            },
            ImportedBone {
                name: "hip".into(),
                offset_matrix: DMat4::from_translation(DVec3::new(0.0, -1.0, 0.0)),
                weights: vec![
                    VertexWeight { vertex: 1, weight: 1.0 },
                    VertexWeight { vertex: 2, weight: 0.5 },
                ],
            },
        ],
        ..triangle_mesh()
    };
    let rigid = ImportedMesh {
        name: "box".into(),
        material_index: 1,
        ..triangle_mesh()
    };

    let mut bend_knee = ImportedChannel::new("knee");
    bend_knee.rotation_keys = vec![
        Key::new(0.0, Quat::IDENTITY),
        Key::new(2.0, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
    ];
    let mut lift_hip = ImportedChannel::new("hip");
    lift_hip.position_keys = vec![
        Key::new(0.0, Vec3::new(0.0, 1.0, 0.0)),
        Key::new(2.0, Vec3::new(0.0, 2.0, 0.0)),
    ];
    let mut grow = ImportedChannel::new("prop");
    grow.scaling_keys = vec![Key::new(0.0, Vec3::ONE), Key::new(15.0, Vec3::splat(2.0))];

    ImportedScene {
        meshes: vec![skinned, rigid],
        materials: vec![
            ImportedMaterial {
                name: "skin".into(),
                ..Default::default()
            },
            ImportedMaterial {
                name: "wood".into(),
                ..Default::default()
            },
        ],
        nodes: vec![root, hip, knee, prop],
        animations: vec![
            ImportedAnimation {
                name: "bend".into(),
                ticks_per_second: 1.0,
                duration: 2.0,
                channels: vec![bend_knee, lift_hip],
            },
            ImportedAnimation {
                name: "grow".into(),
                // Falls back to the frame rate
                ticks_per_second: 0.0,
                duration: 30.0,
                channels: vec![grow],
            },
        ],
        ..Default::default()
    }
}
