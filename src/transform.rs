use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Decomposed rigid transform with scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Builds a transform from a column-major 4x4 matrix as reported by
    /// `XRRigidTransform.matrix`. Returns `None` unless exactly 16 values are
    /// supplied.
    pub fn from_column_major(values: &[f32]) -> Option<Self> {
        let array: &[f32; 16] = values.try_into().ok()?;
        Some(Self::from_matrix(Mat4::from_cols_array(array)))
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Same placement with the scale replaced by `factor` on every axis.
    pub fn with_uniform_scale(self, factor: f32) -> Self {
        Self {
            scale: Vec3::splat(factor),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_major_array_decomposes() {
        let matrix = Mat4::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(1.0, 0.0, -2.0),
        );
        let transform = Transform::from_column_major(&matrix.to_cols_array()).unwrap();
        assert!(transform.translation.abs_diff_eq(Vec3::new(1.0, 0.0, -2.0), 1e-5));
        assert!(transform.matrix().abs_diff_eq(matrix, 1e-5));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Transform::from_column_major(&[0.0; 12]).is_none());
    }

    #[test]
    fn uniform_scale_keeps_placement() {
        let transform = Transform::from_translation(Vec3::X).with_uniform_scale(0.5);
        assert_eq!(transform.translation, Vec3::X);
        assert_eq!(transform.scale, Vec3::splat(0.5));
    }
}
