use std::path::{Path, PathBuf};

use log::{debug, error, info};
use prism_assets::{GltfSource, ImportError, SceneSource};
use prism_renderer::{Drawable, RenderBackend};

use crate::{
    Result, SceneError,
    animation::clock,
    node_graph, skinning,
    store::SceneStore,
};

/// Frame rate used when a clip has no ticks-per-second of its own.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterState {
    Uninitialized,
    SourceRead,
    GraphBuilt,
    Posed,
}

/// Sampling plan for one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalInfo {
    pub n_steps: usize,
    /// `[0, duration in seconds]`.
    pub range: [f64; 2],
    pub frame_rate: f64,
}

impl TemporalInfo {
    /// Time of step `k`, in seconds.
    pub fn sample_time(&self, k: usize) -> f64 {
        k as f64 / self.frame_rate
    }

    /// Sample times in order. Generated on demand, so long clips can be
    /// cut short with `take`.
    pub fn sample_times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.n_steps).map(|k| self.sample_time(k))
    }
}

/// Loads one model file and poses it over time.
///
/// Lifecycle: [`begin`](Self::begin) reads the file, [`import_actors`](Self::import_actors)
/// hands drawables to a backend, [`update_time`](Self::update_time) poses the
/// scene. [`release_resources`](Self::release_resources) starts over.
pub struct SceneImporter {
    source: Box<dyn SceneSource>,
    file_name: Option<PathBuf>,
    state: ImporterState,
    store: Option<SceneStore>,
    enabled: Vec<bool>,
    frame_rate: f64,
    parallel_skinning: bool,
    // Set when the pose must be recomputed even without enabled clips
    dirty: bool,
}

impl Default for SceneImporter {
    fn default() -> Self {
        Self::with_source(GltfSource)
    }
}

impl SceneImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: impl SceneSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            file_name: None,
            state: ImporterState::Uninitialized,
            store: None,
            enabled: Vec::new(),
            frame_rate: DEFAULT_FRAME_RATE,
            parallel_skinning: false,
            dirty: false,
        }
    }

    pub fn set_file_name(&mut self, path: impl Into<PathBuf>) {
        self.file_name = Some(path.into());
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn state(&self) -> ImporterState {
        self.state
    }

    /// Fallback for clips that do not declare ticks per second.
    pub fn set_frame_rate(&mut self, frame_rate: f64) -> Result<()> {
        check_frame_rate(frame_rate)?;
        self.frame_rate = frame_rate;
        Ok(())
    }

    pub fn set_parallel_skinning(&mut self, parallel: bool) {
        self.parallel_skinning = parallel;
    }

    /// Reads the file. On failure nothing from it is kept.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != ImporterState::Uninitialized {
            return Err(SceneError::InvalidState {
                expected: "Uninitialized",
                found: self.state,
            });
        }
        let path = self.file_name.clone().ok_or(SceneError::NoSource)?;

        let store = self.read(&path).inspect_err(|e| {
            error!("Failed to import {}: {e}", path.display());
        })?;

        info!(
            "Read {} ({} animations)",
            path.display(),
            store.clips().len()
        );
        self.enabled = vec![true; store.clips().len()];
        self.store = Some(store);
        self.state = ImporterState::SourceRead;
        Ok(())
    }

    fn read(&self, path: &Path) -> std::result::Result<SceneStore, ImportError> {
        if !self.source.supports(path) {
            return Err(ImportError::InvalidInput(format!(
                "no reader for {}",
                path.display()
            )));
        }
        let scene = self.source.read(path)?;
        SceneStore::from_imported(&scene, path)
    }

    /// Creates the drawables and registers them with `backend`.
    ///
    /// Calling it again rebuilds them in the same order.
    pub fn import_actors(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        let state = self.state;
        let store = self.store.as_mut().ok_or(SceneError::InvalidState {
            expected: "SourceRead",
            found: state,
        })?;

        node_graph::instantiate_drawables(store, backend);
        self.dirty = true;
        self.state = ImporterState::GraphBuilt;
        Ok(())
    }

    /// Poses the scene at `seconds`: samples enabled clips, recomputes
    /// globals and user matrices, then publishes joint matrices.
    pub fn update_time(&mut self, seconds: f64) -> Result<()> {
        if !matches!(self.state, ImporterState::GraphBuilt | ImporterState::Posed) {
            return Err(SceneError::InvalidState {
                expected: "GraphBuilt or Posed",
                found: self.state,
            });
        }
        let Some(store) = self.store.as_mut() else {
            return Err(SceneError::InvalidState {
                expected: "GraphBuilt or Posed",
                found: ImporterState::Uninitialized,
            });
        };

        let any_enabled = self.enabled.iter().any(|e| *e);
        if !any_enabled && !self.dirty {
            // Nothing animates, the rest pose is already in place
            return Ok(());
        }

        clock::clear_joint_matrices(&mut store.drawables);
        for (clip, _) in store
            .clips
            .iter()
            .zip(&self.enabled)
            .filter(|(_, enabled)| **enabled)
        {
            clock::apply(&mut store.nodes, clip, seconds, self.frame_rate);
        }

        node_graph::propagate(&mut store.nodes);
        node_graph::refresh_user_matrices(store);
        skinning::update(store, self.parallel_skinning);

        self.dirty = false;
        self.state = ImporterState::Posed;
        Ok(())
    }

    pub fn number_of_animations(&self) -> usize {
        self.store.as_ref().map_or(0, |s| s.clips().len())
    }

    pub fn animation_name(&self, index: usize) -> Result<&str> {
        self.clip_index(index)?;
        Ok(self
            .store
            .as_ref()
            .map_or("", |s| s.clips()[index].name.as_str()))
    }

    pub fn enable_animation(&mut self, index: usize) -> Result<()> {
        self.set_enabled(index, true)
    }

    pub fn disable_animation(&mut self, index: usize) -> Result<()> {
        self.set_enabled(index, false)
    }

    pub fn is_animation_enabled(&self, index: usize) -> bool {
        self.enabled.get(index).copied().unwrap_or(false)
    }

    fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        self.clip_index(index)?;
        if self.enabled[index] == enabled {
            return Ok(());
        }
        self.enabled[index] = enabled;

        // Nodes this clip drove go back to rest so the next pose only
        // depends on the enabled set
        if let Some(store) = self.store.as_mut() {
            let clip = &store.clips[index];
            for id in clip.driven_nodes() {
                let node = &mut store.nodes[id.0];
                node.local = node.rest_local;
            }
            debug!(
                "Animation '{}' {}",
                clip.name,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.dirty = true;
        Ok(())
    }

    fn clip_index(&self, index: usize) -> Result<usize> {
        let count = self.number_of_animations();
        if index >= count {
            return Err(SceneError::AnimationIndex { index, count });
        }
        Ok(index)
    }

    /// Duration and sample times of clip `index` at `frame_rate` samples per
    /// second. Times are `k / frame_rate`, strictly below the duration.
    pub fn temporal_information(&self, index: usize, frame_rate: f64) -> Result<TemporalInfo> {
        check_frame_rate(frame_rate)?;
        self.clip_index(index)?;
        let Some(store) = self.store.as_ref() else {
            return Err(SceneError::AnimationIndex { index, count: 0 });
        };

        let t_max = store.clips[index].duration_seconds(frame_rate);
        Ok(TemporalInfo {
            n_steps: step_count(t_max, frame_rate),
            range: [0.0, t_max],
            frame_rate,
        })
    }

    /// Drops the scene. The file name and options are kept.
    pub fn release_resources(&mut self) {
        if self.store.take().is_some() {
            debug!("Released scene of {:?}", self.file_name);
        }
        self.enabled.clear();
        self.dirty = false;
        self.state = ImporterState::Uninitialized;
    }

    pub fn store(&self) -> Option<&SceneStore> {
        self.store.as_ref()
    }

    pub fn drawables(&self) -> &[Drawable] {
        self.store
            .as_ref()
            .map(SceneStore::drawables)
            .unwrap_or_default()
    }
}

/// Number of `k` with `k / frame_rate < t_max`.
fn step_count(t_max: f64, frame_rate: f64) -> usize {
    if !t_max.is_finite() || t_max <= 0.0 {
        return 0;
    }
    let mut n = (t_max * frame_rate).ceil().min(usize::MAX as f64) as usize;
    // Rounding in the division can move the boundary by a step either way
    while n > 0 && (n - 1) as f64 / frame_rate >= t_max {
        n -= 1;
    }
    while n < usize::MAX && (n as f64 / frame_rate) < t_max {
        n += 1;
    }
    n
}

fn check_frame_rate(frame_rate: f64) -> Result<()> {
    if frame_rate.is_finite() && frame_rate > 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidFrameRate(frame_rate))
    }
}
