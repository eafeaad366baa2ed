// Re-export glam for convenience
pub use glam::*;

// Verdant math types
mod aabb;
mod frame;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};
