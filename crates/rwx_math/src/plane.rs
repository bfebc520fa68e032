//! Plane fitting for polygon loops.

use glam::{Quat, Vec2, Vec3};

/// Normal of a polygon loop using Newell's method.
///
/// Sums the cross-product terms over consecutive vertex pairs, which stays
/// stable for slightly non-planar or nearly collinear loops. Returns
/// `Vec3::ZERO` when the loop encloses no area.
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;

    for (i, current) in points.iter().enumerate() {
        let next = points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal.normalize_or_zero()
}

/// Orthonormal frame lying on a plane, used to flatten 3D loops to 2D.
///
/// `z` is the plane normal, `x` is the canonical X axis carried onto the
/// plane by the shortest rotation taking +Z to the normal, and `y = x × z`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaneBasis {
    pub origin: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl PlaneBasis {
    /// Build the frame. `None` if `normal` has no usable direction.
    pub fn from_normal(origin: Vec3, normal: Vec3) -> Option<Self> {
        let z = normal.try_normalize()?;
        let rotation = Quat::from_rotation_arc(Vec3::Z, z);
        let x = rotation * Vec3::X;
        let y = x.cross(z).try_normalize()?;

        Some(Self { origin, x, y, z })
    }

    /// Coordinates of `point` in the (x, y) plane relative to the origin.
    pub fn project(&self, point: Vec3) -> Vec2 {
        let d = point - self.origin;
        Vec2::new(d.dot(self.x), d.dot(self.y))
    }
}
