//! # wraith_math - Spatial math for agent simulation
//!
//! Small, dependency-free math primitives used by the perception and
//! navigation layers: 3D vectors, rays, axis-aligned boxes and the
//! intersection tests needed for line-of-sight queries.

pub mod bounds;
pub mod intersect;
pub mod ray;
pub mod vector;

pub use bounds::*;
pub use intersect::*;
pub use ray::*;
pub use vector::*;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const TAU: f32 = PI * 2.0;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
    pub const EPSILON: f32 = 1e-6;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

/// Convert radians to degrees
#[inline]
pub fn degrees(radians: f32) -> f32 {
    radians * consts::RAD_TO_DEG
}

/// Move `current` toward zero by `amount`, never crossing it
#[inline]
pub fn decay_toward_zero(current: f32, amount: f32) -> f32 {
    (current - amount).max(0.0)
}

pub mod prelude {
    pub use crate::bounds::AABB;
    pub use crate::intersect::{ray_aabb, segment_aabb};
    pub use crate::ray::Ray;
    pub use crate::vector::Vec3;
    pub use crate::{decay_toward_zero, degrees, radians};
}
