// Re-export glam for convenience
pub use glam::*;

// RWX math types
mod aabb;
mod plane;
mod transform;

pub use aabb::Aabb;
pub use plane::{newell_normal, PlaneBasis};
pub use transform::{axis_weighted_rotation, Mat4Ext};
