//! Physics components for ECS entities.

use glam::DVec2;

use crate::error::{PhysicsError, Result};
use crate::physics::geometry::ConvexPolygon;

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by forces and collisions.
    Dynamic,
    /// Immovable.
    Static,
    /// Moved by its own velocity, but never by contacts.
    Kinematic,
}

/// Rigid body component.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
    mass: f64,
    /// Moment of inertia about the center. `f64::INFINITY` locks rotation.
    moment_of_inertia: f64,
    /// Coefficient of restitution (0.0 - 1.0).
    restitution: f64,
    /// Friction coefficient (>= 0).
    friction: f64,
    /// Gravity scale (default: 1.0).
    pub gravity_scale: f64,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    ///
    /// The moment of inertia starts as `mass` (unit radius approximation);
    /// the body builder replaces it with the shape's value.
    pub fn new_dynamic(mass: f64) -> Result<Self> {
        Self::new(RigidBodyType::Dynamic, mass)
    }

    /// Create a new static rigid body.
    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            mass: 1.0,
            moment_of_inertia: 1.0,
            restitution: 1.0,
            friction: 0.8,
            gravity_scale: 0.0,
        }
    }

    /// Create a new kinematic rigid body.
    pub fn new_kinematic() -> Self {
        Self {
            body_type: RigidBodyType::Kinematic,
            ..Self::new_static()
        }
    }

    pub fn new(body_type: RigidBodyType, mass: f64) -> Result<Self> {
        validate_mass(mass)?;
        Ok(Self {
            body_type,
            mass,
            moment_of_inertia: mass,
            restitution: 1.0,
            friction: 0.8,
            gravity_scale: if body_type == RigidBodyType::Dynamic {
                1.0
            } else {
                0.0
            },
        })
    }

    pub fn with_mass(mut self, mass: f64) -> Result<Self> {
        self.set_mass(mass)?;
        Ok(self)
    }

    pub fn with_restitution(mut self, restitution: f64) -> Result<Self> {
        self.set_restitution(restitution)?;
        Ok(self)
    }

    pub fn with_friction(mut self, friction: f64) -> Result<Self> {
        self.set_friction(friction)?;
        Ok(self)
    }

    pub fn with_moment_of_inertia(mut self, moment_of_inertia: f64) -> Result<Self> {
        self.set_moment_of_inertia(moment_of_inertia)?;
        Ok(self)
    }

    /// Lock rotation by giving the body an infinite moment of inertia.
    pub fn with_fixed_rotation(mut self) -> Self {
        self.moment_of_inertia = f64::INFINITY;
        self
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    #[inline]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    #[inline]
    pub fn moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia
    }

    pub fn set_mass(&mut self, mass: f64) -> Result<()> {
        validate_mass(mass)?;
        self.mass = mass;
        Ok(())
    }

    /// Zero and `f64::INFINITY` are accepted; both leave the body unable to
    /// spin under contacts.
    pub fn set_moment_of_inertia(&mut self, moment_of_inertia: f64) -> Result<()> {
        if !(moment_of_inertia >= 0.0) {
            return Err(PhysicsError::InvalidInertia(moment_of_inertia));
        }
        self.moment_of_inertia = moment_of_inertia;
        Ok(())
    }

    pub fn set_restitution(&mut self, restitution: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&restitution) {
            return Err(PhysicsError::InvalidRestitution(restitution));
        }
        self.restitution = restitution;
        Ok(())
    }

    pub fn set_friction(&mut self, friction: f64) -> Result<()> {
        if !(friction >= 0.0 && friction.is_finite()) {
            return Err(PhysicsError::InvalidFriction(friction));
        }
        self.friction = friction;
        Ok(())
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == RigidBodyType::Dynamic
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == RigidBodyType::Static
    }

    /// Inverse mass seen by the contact resolver. Zero for fixed bodies.
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        if self.is_dynamic() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Inverse moment of inertia seen by the contact resolver.
    #[inline]
    pub fn inverse_inertia(&self) -> f64 {
        if !self.is_dynamic() || self.moment_of_inertia == 0.0 || self.moment_of_inertia.is_infinite() {
            0.0
        } else {
            1.0 / self.moment_of_inertia
        }
    }
}

fn validate_mass(mass: f64) -> Result<()> {
    if mass > 0.0 && mass.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::NonPositiveMass(mass))
    }
}

/// Collider shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Point,
    Circle { radius: f64 },
    ConvexPolygon(ConvexPolygon),
}

/// Collision detection component.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
}

impl Collider {
    pub fn point() -> Self {
        Self {
            shape: ColliderShape::Point,
        }
    }

    pub fn circle(radius: f64) -> Result<Self> {
        Ok(Self {
            shape: ColliderShape::circle(radius)?,
        })
    }

    pub fn polygon(vertices: &[DVec2]) -> Result<Self> {
        Ok(Self {
            shape: ColliderShape::ConvexPolygon(ConvexPolygon::new(vertices)?),
        })
    }

    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Ok(Self {
            shape: ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(width, height)?),
        })
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::Circle { radius: 0.5 },
        }
    }
}

/// Dormancy state of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepState {
    #[default]
    Awake,
    Sleeping,
}

/// Dormancy component: sleep state and the running statistics behind it.
///
/// Thresholds set to `0.0` fall back to the world's `SleepConfig`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepInfo {
    pub state: SleepState,
    /// Time spent below the variance limit.
    pub idle_time: f64,
    pub samples: u32,
    pub mean_position: DVec2,
    pub m2_position: DVec2,
    pub mean_angle: f64,
    pub m2_angle: f64,
    pub speed_limit: f64,
    pub variance_limit: f64,
    pub time_limit: f64,
}

impl SleepInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(speed_limit: f64, variance_limit: f64, time_limit: f64) -> Self {
        Self {
            speed_limit,
            variance_limit,
            time_limit,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.state == SleepState::Sleeping
    }

    /// Clear the statistics and the idle timer. Limits are kept.
    pub fn reset_statistics(&mut self) {
        self.idle_time = 0.0;
        self.samples = 0;
        self.mean_position = DVec2::ZERO;
        self.m2_position = DVec2::ZERO;
        self.mean_angle = 0.0;
        self.m2_angle = 0.0;
    }

    /// Transition to awake and reset all statistics.
    pub fn wake(&mut self) {
        self.state = SleepState::Awake;
        self.reset_statistics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_validation() {
        assert!(RigidBody::new_dynamic(2.0).is_ok());
        assert_eq!(
            RigidBody::new_dynamic(0.0).unwrap_err(),
            PhysicsError::NonPositiveMass(0.0)
        );
        assert!(RigidBody::new_dynamic(-1.0).is_err());
        assert!(RigidBody::new_dynamic(f64::INFINITY).is_err());
        assert!(RigidBody::new_dynamic(f64::NAN).is_err());
    }

    #[test]
    fn test_material_validation() {
        let body = RigidBody::new_dynamic(1.0).unwrap();
        assert!(body.clone().with_restitution(1.5).is_err());
        assert!(body.clone().with_restitution(-0.1).is_err());
        assert!(body.clone().with_friction(-0.5).is_err());
        let body = body.with_restitution(0.25).unwrap().with_friction(2.0).unwrap();
        assert_eq!(body.restitution(), 0.25);
        assert_eq!(body.friction(), 2.0);
    }

    #[test]
    fn test_moment_of_inertia_validation() {
        let body = RigidBody::new_dynamic(1.0).unwrap();
        assert_eq!(
            body.clone().with_moment_of_inertia(-1.0).unwrap_err(),
            PhysicsError::InvalidInertia(-1.0)
        );
        assert!(body.clone().with_moment_of_inertia(f64::NAN).is_err());
        assert!(body.clone().with_moment_of_inertia(0.0).is_ok());
        assert!(body.clone().with_moment_of_inertia(f64::INFINITY).is_ok());

        let mut body = body;
        assert!(body.set_moment_of_inertia(-0.5).is_err());
        assert_eq!(body.moment_of_inertia(), 1.0);
        assert!(body.set_moment_of_inertia(3.0).is_ok());
        assert_eq!(body.moment_of_inertia(), 3.0);
    }

    #[test]
    fn test_inverse_quantities() {
        let body = RigidBody::new_dynamic(4.0).unwrap().with_moment_of_inertia(2.0).unwrap();
        assert_eq!(body.inverse_mass(), 0.25);
        assert_eq!(body.inverse_inertia(), 0.5);

        let locked = body.clone().with_fixed_rotation();
        assert_eq!(locked.inverse_inertia(), 0.0);
        assert_eq!(locked.inverse_mass(), 0.25);

        assert_eq!(RigidBody::new_static().inverse_mass(), 0.0);
        assert_eq!(RigidBody::new_kinematic().inverse_inertia(), 0.0);
    }

    #[test]
    fn test_collider_constructors() {
        assert!(Collider::circle(0.0).is_err());
        assert!(Collider::circle(1.0).is_ok());
        assert!(Collider::rectangle(2.0, 1.0).is_ok());
        assert_eq!(Collider::point().shape, ColliderShape::Point);
    }

    #[test]
    fn test_sleep_info_wake_resets() {
        let mut info = SleepInfo::with_limits(0.1, 0.2, 1.0);
        info.state = SleepState::Sleeping;
        info.idle_time = 3.0;
        info.samples = 10;
        info.mean_angle = 0.4;
        info.wake();
        assert!(!info.is_sleeping());
        assert_eq!(info.samples, 0);
        assert_eq!(info.idle_time, 0.0);
        assert_eq!(info.mean_angle, 0.0);
        assert_eq!(info.speed_limit, 0.1);
    }
}
