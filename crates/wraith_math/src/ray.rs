//! Rays cast from an agent's eyes

use crate::vector::Vec3;

/// Half-line from `origin` along a unit `direction`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length, or zero when built from coincident points
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from `eye` toward `target`, along with the distance between them
    #[inline]
    pub fn toward(eye: Vec3, target: Vec3) -> (Self, f32) {
        (Self::new(eye, target - eye), eye.distance(target))
    }

    /// Point `t` units along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Origin and direction components for one axis (0 = x, 1 = y, 2 = z)
    #[inline]
    pub(crate) fn axis(&self, axis: usize) -> (f32, f32) {
        match axis {
            0 => (self.origin.x, self.direction.x),
            1 => (self.origin.y, self.direction.y),
            _ => (self.origin.z, self.direction.z),
        }
    }

    /// False for a ray with no direction
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.direction != Vec3::ZERO
    }
}
