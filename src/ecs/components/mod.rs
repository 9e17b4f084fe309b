//! ECS components (body state, physics).

pub mod physics;
pub mod transform;

pub use physics::*;
pub use transform::*;
