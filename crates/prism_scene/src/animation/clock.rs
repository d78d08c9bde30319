use glam::DMat4;
use log::trace;
use prism_renderer::{Drawable, JOINT_MATRICES_UNIFORM};

use crate::{animation::Clip, store::SceneNode};

/// Converts seconds into the clip's tick domain.
pub fn track_time(seconds: f64, clip: &Clip, frame_rate: f64) -> f64 {
    seconds * clip.effective_rate(frame_rate)
}

/// Clears the local matrix of every node `clip` drives.
pub fn reset_driven(nodes: &mut [SceneNode], clip: &Clip) {
    for id in clip.driven_nodes() {
        nodes[id.0].local = DMat4::IDENTITY;
    }
}

/// Drops last frame's joint palettes before a new pose is written.
pub fn clear_joint_matrices(drawables: &mut [Drawable]) {
    for drawable in drawables {
        if drawable.vertex_uniforms.get(JOINT_MATRICES_UNIFORM).is_some() {
            drawable.vertex_uniforms.remove_all();
        }
    }
}

/// Writes the local matrices of the nodes driven by `clip` at `seconds`.
pub fn apply(nodes: &mut [SceneNode], clip: &Clip, seconds: f64, frame_rate: f64) {
    let t = track_time(seconds, clip, frame_rate);
    trace!("Clip '{}' at {seconds}s -> {t} ticks", clip.name);

    reset_driven(nodes, clip);
    for channel in &clip.channels {
        let node = &mut nodes[channel.node.0];
        node.local = channel.sample(t, &node.rest);
    }
}
