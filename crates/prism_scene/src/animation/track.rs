use glam::{Quat, Vec3};
use log::warn;
use prism_assets::imported::{AnimBehaviour, Key};
use prism_core::slerp_shortest;

/// What a track returns for times before its first or after its last key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolation {
    /// Hold the nearest end key.
    #[default]
    Clamp,
    /// Wrap the time back into the key range.
    Repeat,
    /// Extend the end segment. Rotations clamp instead.
    Linear,
}

impl From<AnimBehaviour> for Extrapolation {
    fn from(b: AnimBehaviour) -> Self {
        match b {
            AnimBehaviour::Default | AnimBehaviour::Constant => Extrapolation::Clamp,
            AnimBehaviour::Repeat => Extrapolation::Repeat,
            AnimBehaviour::Linear => Extrapolation::Linear,
        }
    }
}

/// A keyframe value type.
pub trait Keyframe: Copy {
    /// Value at `d` in `[0, 1]` between `a` and `b`.
    fn interpolate(a: Self, b: Self, d: f32) -> Self;

    /// Value at `d` outside `[0, 1]` along the segment `a -> b`.
    fn extrapolate(a: Self, b: Self, d: f32) -> Self;
}

impl Keyframe for Vec3 {
    fn interpolate(a: Self, b: Self, d: f32) -> Self {
        a.lerp(b, d)
    }

    fn extrapolate(a: Self, b: Self, d: f32) -> Self {
        a.lerp(b, d)
    }
}

impl Keyframe for Quat {
    fn interpolate(a: Self, b: Self, d: f32) -> Self {
        slerp_shortest(a, b, d)
    }

    fn extrapolate(a: Self, b: Self, d: f32) -> Self {
        if d <= 0.0 { a } else { b }
    }
}

/// Sorted keyframes for one TRS component of one node.
#[derive(Debug, Clone)]
pub struct Track<T> {
    keys: Vec<Key<T>>,
    pre: Extrapolation,
    post: Extrapolation,
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            pre: Extrapolation::Clamp,
            post: Extrapolation::Clamp,
        }
    }
}

impl<T: Keyframe> Track<T> {
    /// Keys out of order are sorted and repeated times keep their first key,
    /// both with a warning. Non-finite times are dropped.
    pub fn new(mut keys: Vec<Key<T>>, pre: Extrapolation, post: Extrapolation) -> Self {
        let before = keys.len();
        keys.retain(|k| k.time.is_finite());
        if keys.len() != before {
            warn!("Dropped {} keys with non-finite times", before - keys.len());
        }

        if !keys.is_sorted_by(|a, b| a.time <= b.time) {
            warn!("Keyframe times are not sorted, sorting");
            keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        }

        let before = keys.len();
        keys.dedup_by(|later, earlier| later.time == earlier.time);
        if keys.len() != before {
            warn!("Dropped {} keys with duplicate times", before - keys.len());
        }

        Self { keys, pre, post }
    }

    pub fn clamped(keys: Vec<Key<T>>) -> Self {
        Self::new(keys, Extrapolation::Clamp, Extrapolation::Clamp)
    }

    pub fn keys(&self) -> &[Key<T>] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first_time(&self) -> Option<f64> {
        self.keys.first().map(|k| k.time)
    }

    pub fn last_time(&self) -> Option<f64> {
        self.keys.last().map(|k| k.time)
    }

    /// Value of the track at `t` (in ticks), `None` when it has no keys.
    pub fn sample(&self, t: f64) -> Option<T> {
        let (first, last) = (self.keys.first()?, self.keys.last()?);

        if t < first.time {
            return Some(match self.pre {
                Extrapolation::Clamp => first.value,
                Extrapolation::Repeat => self.sample_within(self.wrap(t)),
                Extrapolation::Linear => self.extend(0, t),
            });
        }
        if t > last.time {
            return Some(match self.post {
                Extrapolation::Clamp => last.value,
                Extrapolation::Repeat => self.sample_within(self.wrap(t)),
                Extrapolation::Linear => self.extend(self.keys.len().saturating_sub(2), t),
            });
        }
        Some(self.sample_within(t))
    }

    // `t` is inside [first, last]
    fn sample_within(&self, t: f64) -> T {
        // First key with time >= t
        let next = self.keys.partition_point(|k| k.time < t);
        if next == self.keys.len() {
            return self.keys[next - 1].value;
        }

        let next_key = &self.keys[next];
        if next == 0 || next_key.time == t {
            return next_key.value;
        }

        let prev = &self.keys[next - 1];
        let d = (t - prev.time) / (next_key.time - prev.time);
        T::interpolate(prev.value, next_key.value, d as f32)
    }

    fn wrap(&self, t: f64) -> f64 {
        let (first, last) = (self.keys[0].time, self.keys[self.keys.len() - 1].time);
        let span = last - first;
        if span <= 0.0 {
            return first;
        }
        first + (t - first).rem_euclid(span)
    }

    // Extends the segment starting at key `i`
    fn extend(&self, i: usize, t: f64) -> T {
        let Some(b) = self.keys.get(i + 1) else {
            return self.keys[i].value;
        };
        let a = &self.keys[i];
        let d = (t - a.time) / (b.time - a.time);
        T::extrapolate(a.value, b.value, d as f32)
    }
}
