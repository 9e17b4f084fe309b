//! impulse2d
//!
//! A discrete-time 2D rigid body simulation core on top of a `hecs` world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **error** - Construction-time validation errors
//! 2. **ecs** - Components stored on `hecs` entities (body, collider, state, dormancy)
//! 3. **physics** - Geometry, broad and narrow phase, contact resolution,
//!    dormancy, integration and the fixed-timestep [`PhysicsWorld`]
//!
//! # Example
//!
//! ```
//! use impulse2d::glam::DVec2;
//! use impulse2d::prelude::*;
//!
//! let mut world = hecs::World::new();
//! let mut physics = PhysicsWorld::new(PhysicsConfig::default());
//!
//! let ball = BodyBuilder::dynamic(ColliderShape::circle(0.5)?)
//!     .position(DVec2::new(0.0, 5.0))
//!     .spawn(&mut world)?;
//! BodyBuilder::fixed(ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(20.0, 1.0)?))
//!     .position(DVec2::new(0.0, -0.5))
//!     .spawn(&mut world)?;
//!
//! for _ in 0..120 {
//!     physics.step(&mut world, 1.0 / 60.0);
//! }
//! assert!(world.get::<&BodyState>(ball).unwrap().position.y > 0.0);
//! # Ok::<(), impulse2d::PhysicsError>(())
//! ```

pub mod ecs;
pub mod error;
pub mod physics;

pub mod prelude {
    pub use crate::ecs::prelude::*;
    pub use crate::error::{PhysicsError, Result};
    pub use crate::physics::behaviors::{
        Attractor, ConstantAcceleration, ForceBehavior, NewtonianAttraction,
    };
    pub use crate::physics::contact::{CandidatePair, Contact};
    pub use crate::physics::events::{StepEvent, StepEventKind};
    pub use crate::physics::geometry::{Aabb, ConvexPolygon};
    pub use crate::physics::{PhysicsConfig, PhysicsWorld, ResolverConfig, SleepConfig};
    pub use hecs;
}

pub use error::{PhysicsError, Result};
pub use physics::{PhysicsConfig, PhysicsWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
