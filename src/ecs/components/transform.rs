//! Kinematic state and rigid transforms for 2D bodies.

use glam::DVec2;

/// Rigid 2D transform: rotation about the origin followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub translation: DVec2,
    pub angle: f64,
    cos: f64,
    sin: f64,
}

impl Transform2D {
    pub fn new(translation: DVec2, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            translation,
            angle,
            cos,
            sin,
        }
    }

    pub fn identity() -> Self {
        Self::new(DVec2::ZERO, 0.0)
    }

    pub fn from_angle(angle: f64) -> Self {
        Self::new(DVec2::ZERO, angle)
    }

    /// Rotate a local-space direction into world space.
    #[inline]
    pub fn rotate(&self, v: DVec2) -> DVec2 {
        DVec2::new(v.x * self.cos - v.y * self.sin, v.x * self.sin + v.y * self.cos)
    }

    /// Rotate a world-space direction into local space.
    #[inline]
    pub fn rotate_inv(&self, v: DVec2) -> DVec2 {
        DVec2::new(v.x * self.cos + v.y * self.sin, -v.x * self.sin + v.y * self.cos)
    }

    #[inline]
    pub fn transform_point(&self, local: DVec2) -> DVec2 {
        self.rotate(local) + self.translation
    }

    #[inline]
    pub fn inverse_transform_point(&self, world: DVec2) -> DVec2 {
        self.rotate_inv(world - self.translation)
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// Linear and angular state of a body at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub position: DVec2,
    pub velocity: DVec2,
    pub acceleration: DVec2,
    pub angle: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
}

/// Kinematic state component.
///
/// `previous` holds the snapshot the integrator takes before each phase.
/// The resolver shifts `previous.position` together with `position` so the
/// separation it applies is not read back as velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyState {
    pub position: DVec2,
    pub velocity: DVec2,
    /// Accumulated acceleration for the next velocity integration.
    pub acceleration: DVec2,
    pub angle: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
    pub previous: Kinematics,
}

impl BodyState {
    pub fn from_position(position: DVec2) -> Self {
        Self {
            position,
            previous: Kinematics {
                position,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self.previous.angle = angle;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// World transform at the current position and orientation.
    pub fn transform(&self) -> Transform2D {
        Transform2D::new(self.position, self.angle)
    }

    /// Velocity of the material point at `offset` from the center.
    #[inline]
    pub fn velocity_at(&self, offset: DVec2) -> DVec2 {
        self.velocity + offset.perp() * self.angular_velocity
    }

    /// Shift the body and its previous snapshot together.
    pub fn translate(&mut self, offset: DVec2) {
        self.position += offset;
        self.previous.position += offset;
    }

    pub fn clear_motion(&mut self) {
        self.velocity = DVec2::ZERO;
        self.acceleration = DVec2::ZERO;
        self.angular_velocity = 0.0;
        self.angular_acceleration = 0.0;
    }
}
