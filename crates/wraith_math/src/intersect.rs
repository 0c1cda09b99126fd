//! Line-of-sight tests against box obstacles

use crate::bounds::AABB;
use crate::ray::Ray;
use crate::vector::Vec3;

/// Distance along `ray` to where it first enters `aabb`.
///
/// A ray starting inside the box reports the exit distance. `None` when
/// the box is missed or lies entirely behind the origin.
pub fn ray_aabb(ray: &Ray, aabb: &AABB) -> Option<f32> {
    if !ray.is_valid() {
        return None;
    }

    let lo = [aabb.min.x, aabb.min.y, aabb.min.z];
    let hi = [aabb.max.x, aabb.max.y, aabb.max.z];
    let mut enter = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;

    for axis in 0..3 {
        let (origin, direction) = ray.axis(axis);
        if direction == 0.0 {
            // Parallel to this slab: either always inside it or never
            if origin < lo[axis] || origin > hi[axis] {
                return None;
            }
            continue;
        }
        let a = (lo[axis] - origin) / direction;
        let b = (hi[axis] - origin) / direction;
        enter = enter.max(a.min(b));
        exit = exit.min(a.max(b));
        if enter > exit {
            return None;
        }
    }

    if exit < 0.0 {
        None
    } else if enter < 0.0 {
        Some(exit)
    } else {
        Some(enter)
    }
}

/// Whether the straight segment `from -> to` touches the box.
///
/// Endpoints lying inside the box count as a hit.
pub fn segment_aabb(from: Vec3, to: Vec3, aabb: &AABB) -> bool {
    if aabb.contains_point(from) || aabb.contains_point(to) {
        return true;
    }
    let (ray, length) = Ray::toward(from, to);
    ray_aabb(&ray, aabb).map_or(false, |t| t <= length)
}
