use glam::Vec3;

use super::AABB;

/// Half-line used for pointer picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Slab test - distance along the ray to the first hit, None on miss
pub fn intersect_aabb(ray: &Ray, bounds: &AABB) -> Option<f32> {
    const EPSILON: f32 = 1e-8;

    // Clamp near-zero components so the inverse stays finite
    let inv = |d: f32| {
        if d.abs() < EPSILON {
            1.0 / EPSILON.copysign(d)
        } else {
            1.0 / d
        }
    };
    let inv_dir = Vec3::new(inv(ray.direction.x), inv(ray.direction.y), inv(ray.direction.z));

    let t_min = (bounds.min - ray.origin) * inv_dir;
    let t_max = (bounds.max - ray.origin) * inv_dir;

    let t1 = t_min.min(t_max);
    let t2 = t_min.max(t_max);

    let t_near = t1.max_element();
    let t_far = t2.min_element();

    if t_near > t_far || t_far < 0.0 {
        return None;
    }

    // Origin inside the box: report the exit point
    Some(if t_near < 0.0 { t_far } else { t_near })
}
