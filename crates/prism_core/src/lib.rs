pub use glam;

pub mod math;
pub mod transform;

pub use math::*;
pub use transform::Transform;
