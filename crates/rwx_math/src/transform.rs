// Transform utilities for Mat4
//
// Extends glam::Mat4 with the helpers the RWX loader needs on top of
// transform_point3() and friends.

use glam::{Mat4, Vec3};
use crate::Aabb;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        let mut result = Aabb::EMPTY;
        for corner in aabb.corners() {
            result.grow(self.transform_point3(corner));
        }
        result
    }
}

/// Build the matrix for an RWX `rotate x y z angle` statement.
///
/// Each non-zero axis weight contributes an elementary rotation of
/// `weight * angle` degrees, composed X then Y then Z.
pub fn axis_weighted_rotation(weights: Vec3, angle_degrees: f32) -> Mat4 {
    let mut result = Mat4::IDENTITY;

    if weights.x != 0.0 {
        result *= Mat4::from_rotation_x((weights.x * angle_degrees).to_radians());
    }
    if weights.y != 0.0 {
        result *= Mat4::from_rotation_y((weights.y * angle_degrees).to_radians());
    }
    if weights.z != 0.0 {
        result *= Mat4::from_rotation_z((weights.z * angle_degrees).to_radians());
    }

    result
}
