//! 4x4 matrix and quaternion helpers shared by the scene and the animation code.
//!
//! Matrices are `glam::DMat4`: double precision, column-major storage and
//! column-vector convention. Composition therefore reads right to left:
//! `parent * local` maps a point from the local frame into the parent frame.
//! The animation side works with `f32` keys and is widened on its way in.

use glam::{DMat4, DQuat, DVec3, Quat};

/// Below this angle cosine distance slerp falls back to normalized lerp.
pub const SLERP_EPSILON: f32 = 1e-6;

/// Determinants smaller than this are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// `parent * local`, the global matrix of a child given its parent's global.
#[inline]
pub fn compose(parent: &DMat4, local: &DMat4) -> DMat4 {
    *parent * *local
}

/// Inverse of `m`, or `None` when the matrix is singular or not finite.
pub fn try_invert(m: &DMat4) -> Option<DMat4> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return None;
    }
    let inv = m.inverse();
    inv.is_finite().then_some(inv)
}

/// Normalizes `q`; a zero-length or non-finite quaternion yields identity.
pub fn normalize_or_identity(q: DQuat) -> DQuat {
    let len = q.length();
    if !len.is_finite() || len <= f64::EPSILON {
        return DQuat::IDENTITY;
    }
    q / len
}

/// Builds `T * R * S`.
///
/// The upper-left 3x3 block is `R(rotation)` with column `j` scaled by
/// `scale[j]`, the last column holds `translation` and the bottom row is
/// `(0, 0, 0, 1)`. The quaternion is normalized first.
pub fn compose_trs(translation: DVec3, rotation: DQuat, scale: DVec3) -> DMat4 {
    DMat4::from_scale_rotation_translation(scale, normalize_or_identity(rotation), translation)
}

/// Column-major `f32` layout expected by GPU uniform arrays.
pub fn to_gpu_cols(m: &DMat4) -> [f32; 16] {
    m.to_cols_array().map(|v| v as f32)
}

#[inline]
pub fn widen_quat(q: Quat) -> DQuat {
    DQuat::from_xyzw(q.x as f64, q.y as f64, q.z as f64, q.w as f64)
}

/// Shortest-arc spherical interpolation from `a` (d = 0) to `b` (d = 1).
///
/// When the quaternions lie in opposite hemispheres `b` is negated, and when
/// they are nearly parallel the result is a normalized lerp.
pub fn slerp_shortest(a: Quat, b: Quat, d: f32) -> Quat {
    let mut b = b;
    let mut cos_theta = a.dot(b);
    if cos_theta < 0.0 {
        b = -b;
        cos_theta = -cos_theta;
    }

    let blended = if cos_theta > 1.0 - SLERP_EPSILON {
        a * (1.0 - d) + b * d
    } else {
        let theta = cos_theta.min(1.0).acos();
        let sin_theta = theta.sin();
        let wa = ((1.0 - d) * theta).sin() / sin_theta;
        let wb = (d * theta).sin() / sin_theta;
        a * wa + b * wb
    };

    let len = blended.length();
    if len <= f32::EPSILON || !len.is_finite() {
        Quat::IDENTITY
    } else {
        blended * (1.0 / len)
    }
}
