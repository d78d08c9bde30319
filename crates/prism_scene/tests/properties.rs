mod common;

use std::f32::consts::FRAC_PI_2;

use common::{assert_mat_eq, joints, load, rig, StaticSource};
use glam::{DMat4, DVec3, Quat};
use prism_assets::imported::{ImportedBone, ImportedMesh, ImportedNode, ImportedScene, VertexWeight};
use prism_core::{compose_trs, widen_quat};
use prism_renderer::StagingBackend;
use prism_scene::{ImporterState, SceneError, SceneImporter, SceneStore};

fn globals(store: &SceneStore) -> Vec<DMat4> {
    store.nodes().iter().map(|n| n.global).collect()
}

fn palette(importer: &SceneImporter) -> Vec<DMat4> {
    joints(&importer.drawables()[0])
}

#[test]
fn drawables_come_out_in_the_same_order() {
    let (mut importer, first) = load(rig());
    let order = |importer: &SceneImporter| {
        importer
            .drawables()
            .iter()
            .map(|d| (d.geometry.index, d.material.map(|m| m.index)))
            .collect::<Vec<_>>()
    };
    let before = order(&importer);
    assert_eq!(before, vec![(0, Some(0)), (1, Some(1))]);

    let mut again = StagingBackend::new();
    importer.import_actors(&mut again).unwrap();
    assert_eq!(order(&importer), before);
    assert_eq!(again.drawable_count(), first.drawable_count());

    let (other, _) = load(rig());
    assert_eq!(order(&other), before);
    assert_eq!(other.store().unwrap().drawable_set("prop").unwrap().len(), 1);
}

#[test]
fn same_time_gives_same_pose() {
    let (mut importer, _) = load(rig());

    importer.update_time(0.7).unwrap();
    let (g1, j1) = (globals(importer.store().unwrap()), palette(&importer));

    importer.update_time(1.9).unwrap();
    assert_ne!(palette(&importer), j1);

    importer.update_time(0.7).unwrap();
    assert_eq!(globals(importer.store().unwrap()), g1);
    assert_eq!(palette(&importer), j1);
}

#[test]
fn disabled_clips_leave_the_rest_pose() {
    let (mut importer, _) = load(rig());
    importer.update_time(1.0).unwrap();
    importer.disable_animation(0).unwrap();
    importer.disable_animation(1).unwrap();
    assert!(!importer.is_animation_enabled(0));

    importer.update_time(123.0).unwrap();
    let store = importer.store().unwrap();
    for node in store.nodes() {
        assert_eq!(node.local, node.rest_local, "{}", node.name);
    }

    let root = store.local("root").unwrap();
    let hip = store.local("hip").unwrap();
    let knee = store.local("knee").unwrap();
    assert_eq!(store.global("knee").unwrap(), root * hip * knee);
    assert_eq!(store.global("prop").unwrap(), root * store.local("prop").unwrap());
}

#[test]
fn each_track_clamps_on_its_own_range() {
    let (mut importer, _) = load(rig());

    // Past the end of `grow` (0.5s at 30 fps) but inside `bend` (2s)
    importer.update_time(1.0).unwrap();
    let store = importer.store().unwrap();
    let prop = store.local("prop").unwrap();
    assert!(prop.x_axis.truncate().abs_diff_eq(DVec3::new(2.0, 0.0, 0.0), 1e-6));
    let hip = store.local("hip").unwrap();
    assert!(hip.w_axis.truncate().abs_diff_eq(DVec3::new(0.0, 1.5, 0.0), 1e-6));

    // Before every first key
    importer.update_time(-1.0).unwrap();
    let store = importer.store().unwrap();
    assert_mat_eq(store.local("prop").unwrap(), store.node_by_name("prop").unwrap().rest_local, 1e-12);
    assert_mat_eq(store.local("knee").unwrap(), store.node_by_name("knee").unwrap().rest_local, 1e-12);
}

#[test]
fn key_times_hit_key_values() {
    let (mut importer, _) = load(rig());
    importer.update_time(2.0).unwrap();

    let knee = importer.store().unwrap().node_by_name("knee").unwrap();
    let key = widen_quat(Quat::from_rotation_z(FRAC_PI_2));
    assert_eq!(knee.local, compose_trs(knee.rest.translation, key, knee.rest.scale));
}

#[test]
fn at_most_four_influences_per_vertex() {
    let bones = (0..5)
        .map(|i| ImportedBone {
            name: format!("b{i}"),
            offset_matrix: DMat4::IDENTITY,
            weights: vec![VertexWeight { vertex: 0, weight: 0.2 }],
        })
        .collect();
    let mut root = ImportedNode::new("root");
    root.meshes = vec![0];
    let scene = ImportedScene {
        meshes: vec![ImportedMesh {
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0]],
            faces: vec![vec![0], vec![1]],
            bones,
            ..Default::default()
        }],
        nodes: vec![root],
        ..Default::default()
    };
    let (importer, _) = load(scene);

    let skin = importer.store().unwrap().geometries()[0].skin.clone().unwrap();
    assert_eq!(skin.bones.len(), 5);
    assert_eq!(skin.joint_weights[0].iter().filter(|w| **w != 0.0).count(), 4);
    assert_eq!(skin.joint_indices[0], [0, 1, 2, 3]);
    // Vertex 1 has no influences at all
    assert_eq!(skin.joint_weights[1], [0.0; 4]);
    assert_eq!(skin.joint_indices[1], [0; 4]);
}

#[test]
fn joint_matrices_follow_the_bone_list() {
    let (mut importer, mut backend) = load(rig());
    importer.update_time(1.3).unwrap();

    let store = importer.store().unwrap();
    let geometry = &store.geometries()[0];
    let skin = geometry.skin.as_ref().unwrap();
    let root_inverse = store.global("root").unwrap().inverse();
    let packed = palette(&importer);

    assert_eq!(packed.len(), skin.bones.len());
    let binding = store.skin_binding(importer.drawables()[0].geometry);
    assert_eq!(binding, [store.node_id("knee"), store.node_id("hip")]);
    for (k, bone) in skin.bones.iter().enumerate() {
        let expected = root_inverse * store.global(bone).unwrap() * skin.inverse_bind[k];
        assert_mat_eq(packed[k], expected, 1e-5);
    }
    // Rigid geometry gets no palette
    assert!(joints(&importer.drawables()[1]).is_empty());

    let stats = backend.frame(importer.drawables());
    assert_eq!(stats.drawables, 2);
    assert_eq!(stats.joint_matrices, 2);
}

#[test]
fn rest_pose_skin_is_identity() {
    let (mut importer, _) = load(rig());
    importer.disable_animation(0).unwrap();
    importer.disable_animation(1).unwrap();
    importer.update_time(0.0).unwrap();

    for joint in palette(&importer) {
        assert_mat_eq(joint, DMat4::IDENTITY, 1e-12);
    }
}

#[test]
fn parallel_skinning_matches_sequential() {
    let (mut sequential, _) = load(rig());
    let (mut parallel, _) = load(rig());
    parallel.set_parallel_skinning(true);

    for t in [0.0, 0.4, 1.1, 2.5] {
        sequential.update_time(t).unwrap();
        parallel.update_time(t).unwrap();
        assert_eq!(palette(&parallel), palette(&sequential));
    }
}

#[test]
fn lifecycle_and_temporal_information() {
    let mut importer = SceneImporter::with_source(StaticSource(rig()));
    assert_eq!(importer.state(), ImporterState::Uninitialized);
    importer.set_file_name("rig.gltf");
    importer.begin().unwrap();
    assert_eq!(importer.state(), ImporterState::SourceRead);
    assert!(matches!(importer.begin(), Err(SceneError::InvalidState { .. })));

    assert_eq!(importer.number_of_animations(), 2);
    assert_eq!(importer.animation_name(1).unwrap(), "grow");
    assert!(importer.is_animation_enabled(0) && importer.is_animation_enabled(1));

    let bend = importer.temporal_information(0, 4.0).unwrap();
    assert_eq!(bend.range, [0.0, 2.0]);
    assert_eq!(bend.n_steps, 8);
    let times: Vec<f64> = bend.sample_times().collect();
    assert_eq!(times[..3], [0.0, 0.25, 0.5]);
    assert_eq!(times.last(), Some(&1.75));

    // No ticks per second: the frame rate stands in
    let grow = importer.temporal_information(1, 10.0).unwrap();
    assert_eq!(grow.range, [0.0, 3.0]);
    assert_eq!(grow.n_steps, 30);

    assert!(matches!(
        importer.temporal_information(0, 0.0),
        Err(SceneError::InvalidFrameRate(_))
    ));
    assert!(matches!(
        importer.enable_animation(7),
        Err(SceneError::AnimationIndex { index: 7, count: 2 })
    ));

    let mut backend = StagingBackend::new();
    importer.import_actors(&mut backend).unwrap();
    assert_eq!(importer.state(), ImporterState::GraphBuilt);
    importer.update_time(0.5).unwrap();
    assert_eq!(importer.state(), ImporterState::Posed);
    importer.update_time(0.6).unwrap();
    assert_eq!(importer.state(), ImporterState::Posed);

    importer.release_resources();
    assert_eq!(importer.state(), ImporterState::Uninitialized);
    assert!(importer.drawables().is_empty());
    assert_eq!(importer.number_of_animations(), 0);

    importer.begin().unwrap();
    assert_eq!(importer.state(), ImporterState::SourceRead);
}
