//! Keyframed clips resolved against the scene's node ids.

use std::collections::HashMap;

use glam::{DMat4, Quat, Vec3};
use log::{debug, warn};
use prism_assets::imported::{ImportedAnimation, ImportedChannel};
use prism_core::{Transform, compose_trs, widen_quat};

use crate::store::NodeId;

pub mod clock;
mod track;

pub use track::{Extrapolation, Keyframe, Track};

/// Keyframe tracks driving one node.
#[derive(Debug, Clone)]
pub struct Channel {
    pub node: NodeId,
    pub translation: Track<Vec3>,
    pub rotation: Track<Quat>,
    pub scale: Track<Vec3>,
}

impl Channel {
    fn from_imported(channel: &ImportedChannel, node: NodeId) -> Self {
        let (pre, post) = (channel.pre_state.into(), channel.post_state.into());
        Self {
            node,
            translation: Track::new(channel.position_keys.clone(), pre, post),
            rotation: Track::new(channel.rotation_keys.clone(), pre, post),
            scale: Track::new(channel.scaling_keys.clone(), pre, post),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translation.is_empty() && self.rotation.is_empty() && self.scale.is_empty()
    }

    /// Local matrix at `t` ticks. Components without keys come from `rest`.
    pub fn sample(&self, t: f64, rest: &Transform) -> DMat4 {
        let translation = self
            .translation
            .sample(t)
            .map_or(rest.translation, |v| v.as_dvec3());
        let rotation = self.rotation.sample(t).map_or(rest.rotation, widen_quat);
        let scale = self.scale.sample(t).map_or(rest.scale, |v| v.as_dvec3());
        compose_trs(translation, rotation, scale)
    }
}

#[derive(Debug, Clone)]
pub struct Clip {
    pub name: String,
    /// 0 when the file did not say.
    pub ticks_per_second: f64,
    pub duration: f64,
    pub channels: Vec<Channel>,
}

impl Clip {
    /// Resolves channel node names once. Channels naming no node are dropped.
    pub fn resolve(animation: &ImportedAnimation, names: &HashMap<String, NodeId>) -> Self {
        let channels = animation
            .channels
            .iter()
            .filter_map(|c| {
                let Some(node) = names.get(&c.node_name) else {
                    warn!(
                        "Animation '{}': channel targets unknown node '{}'",
                        animation.name, c.node_name
                    );
                    return None;
                };
                let channel = Channel::from_imported(c, *node);
                if channel.is_empty() {
                    warn!(
                        "Animation '{}': channel for '{}' has no keys, node stays at rest",
                        animation.name, c.node_name
                    );
                }
                Some(channel)
            })
            .collect::<Vec<_>>();

        debug!(
            "Animation '{}': {} channels, {} ticks at {} ticks/s",
            animation.name,
            channels.len(),
            animation.duration,
            animation.ticks_per_second
        );

        Self {
            name: animation.name.clone(),
            ticks_per_second: animation.ticks_per_second,
            duration: animation.duration,
            channels,
        }
    }

    pub fn driven_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.channels.iter().map(|c| c.node)
    }

    /// Ticks per second, or `frame_rate` when the clip does not declare it.
    pub fn effective_rate(&self, frame_rate: f64) -> f64 {
        if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            frame_rate
        }
    }

    /// Length in seconds.
    pub fn duration_seconds(&self, frame_rate: f64) -> f64 {
        self.duration / self.effective_rate(frame_rate)
    }
}
