use glam::{DMat4, DQuat, DVec3};

use crate::math::{compose_trs, normalize_or_identity};

/// Translation, rotation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            translation: DVec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    /// Splits an affine matrix into its TRS parts.
    ///
    /// Matrices with shear cannot be represented exactly; the result is the
    /// closest TRS glam can extract. A degenerate rotation comes back as
    /// identity.
    pub fn from_matrix(matrix: &DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation: normalize_or_identity(rotation),
            scale,
        }
    }

    /// Local -> parent matrix.
    pub fn compute_matrix(&self) -> DMat4 {
        compose_trs(self.translation, self.rotation, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_round_trip_keeps_components() {
        let t = Transform {
            translation: DVec3::new(1.0, -2.0, 0.5),
            rotation: DQuat::from_rotation_x(0.7),
            scale: DVec3::new(2.0, 2.0, 3.0),
        };
        let back = Transform::from_matrix(&t.compute_matrix());
        assert!(back.translation.abs_diff_eq(t.translation, 1e-9));
        assert!(back.rotation.abs_diff_eq(t.rotation, 1e-9));
        assert!(back.scale.abs_diff_eq(t.scale, 1e-9));
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().compute_matrix(), DMat4::IDENTITY);
    }
}
