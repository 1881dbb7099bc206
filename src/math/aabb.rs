use glam::Vec3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centred on the origin with the given full extents
    pub fn from_size(size: Vec3) -> Self {
        let half = size * 0.5;
        Self { min: -half, max: half }
    }
}
