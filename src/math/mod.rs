mod aabb;
mod color;
mod ray;

pub use aabb::AABB;
pub use color::{hex_rgb, linear_to_srgb, srgb_to_linear, with_alpha, HOT_PINK, RED, WHITE};
pub use ray::{intersect_aabb, Ray};
