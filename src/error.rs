//! Construction-time errors.
//!
//! Runtime numerical degeneracies never surface here: the pipeline handles
//! them locally. Only invalid bodies and shapes are rejected, at the point
//! where they are built.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("body mass must be positive and finite, got {0}")]
    NonPositiveMass(f64),

    #[error("restitution must lie in [0, 1], got {0}")]
    InvalidRestitution(f64),

    #[error("friction coefficient must be non-negative, got {0}")]
    InvalidFriction(f64),

    #[error("moment of inertia must be non-negative, got {0}")]
    InvalidInertia(f64),

    #[error("circle radius must be positive and finite, got {0}")]
    InvalidRadius(f64),

    #[error("polygon needs at least 2 distinct vertices and a non-zero area, got {vertices} vertices")]
    DegeneratePolygon { vertices: usize },

    #[error("polygon vertices do not describe a convex hull")]
    NonConvexPolygon,

    #[error("fixed timestep must be positive, got {0}")]
    InvalidTimestep(f64),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
