//! Rigid body integration, disturbance helpers and the body builder.

use glam::DVec2;

use crate::ecs::components::physics::{
    Collider, ColliderShape, RigidBody, RigidBodyType, SleepInfo,
};
use crate::ecs::components::transform::BodyState;
use crate::error::{PhysicsError, Result};

use super::dormancy::wake_body;

#[inline]
fn is_sleeping(sleep: Option<&SleepInfo>) -> bool {
    sleep.is_some_and(|s| s.is_sleeping())
}

/// Accumulate gravity on all awake dynamic rigid bodies.
pub fn apply_gravity(world: &mut hecs::World, gravity: DVec2) {
    for (_, (rb, state, sleep)) in
        world.query_mut::<(&RigidBody, &mut BodyState, Option<&SleepInfo>)>()
    {
        if rb.is_dynamic() && !is_sleeping(sleep) {
            state.acceleration += gravity * rb.gravity_scale;
        }
    }
}

/// Velocity phase of semi-implicit Euler: v += a * dt, then drag.
///
/// The previous velocity and acceleration are snapshotted first and the
/// acceleration is consumed. Drag scales the linear velocity only. Static
/// bodies are pinned at rest.
pub fn integrate_velocities(world: &mut hecs::World, dt: f64, drag: f64) {
    let keep = 1.0 - drag;
    for (_, (rb, state, sleep)) in
        world.query_mut::<(&RigidBody, &mut BodyState, Option<&SleepInfo>)>()
    {
        if rb.is_static() {
            state.clear_motion();
            continue;
        }
        if is_sleeping(sleep) {
            continue;
        }

        state.previous.velocity = state.velocity;
        state.previous.acceleration = state.acceleration;
        state.velocity += state.acceleration * dt;
        if drag != 0.0 {
            state.velocity *= keep;
        }
        state.acceleration = DVec2::ZERO;

        state.previous.angular_velocity = state.angular_velocity;
        state.previous.angular_acceleration = state.angular_acceleration;
        state.angular_velocity += state.angular_acceleration * dt;
        state.angular_acceleration = 0.0;
    }
}

/// Position phase: x += v * dt - a_prev * dt^2 / 2.
///
/// Without contact impulses in between this equals
/// `v_prev * dt + a_prev * dt^2 / 2`; impulses applied by the resolver
/// carry straight into the step.
pub fn integrate_positions(world: &mut hecs::World, dt: f64) {
    let half_dt_dt = 0.5 * dt * dt;
    for (_, (rb, state, sleep)) in
        world.query_mut::<(&RigidBody, &mut BodyState, Option<&SleepInfo>)>()
    {
        if rb.is_static() || is_sleeping(sleep) {
            continue;
        }

        state.previous.position = state.position;
        state.position += state.velocity * dt - state.previous.acceleration * half_dt_dt;

        state.previous.angle = state.angle;
        state.angle +=
            state.angular_velocity * dt - state.previous.angular_acceleration * half_dt_dt;
    }
}

/// Add an acceleration to a dynamic body and wake it.
pub fn accelerate(world: &mut hecs::World, entity: hecs::Entity, acceleration: DVec2) -> bool {
    let applied = match world.query_one_mut::<(&RigidBody, &mut BodyState)>(entity) {
        Ok((rb, state)) if rb.is_dynamic() => {
            state.acceleration += acceleration;
            true
        }
        _ => false,
    };
    if applied {
        wake_body(world, entity);
    }
    applied
}

/// Apply a force at `offset` from the center of a dynamic body.
///
/// Linear acceleration gains `F / m`; angular acceleration gains
/// `(offset x F) / I` unless rotation is locked or the body has no inertia.
pub fn apply_force(
    world: &mut hecs::World,
    entity: hecs::Entity,
    force: DVec2,
    offset: DVec2,
) -> bool {
    let applied = match world.query_one_mut::<(&RigidBody, &mut BodyState)>(entity) {
        Ok((rb, state)) if rb.is_dynamic() => {
            state.acceleration += force / rb.mass();
            let inertia = rb.moment_of_inertia();
            if inertia != 0.0 && inertia.is_finite() {
                state.angular_acceleration += offset.perp_dot(force) / inertia;
            }
            true
        }
        _ => false,
    };
    if applied {
        wake_body(world, entity);
    }
    applied
}

/// Apply an instantaneous impulse at `offset` from the center.
pub fn apply_impulse(
    world: &mut hecs::World,
    entity: hecs::Entity,
    impulse: DVec2,
    offset: DVec2,
) -> bool {
    let applied = match world.query_one_mut::<(&RigidBody, &mut BodyState)>(entity) {
        Ok((rb, state)) if rb.is_dynamic() => {
            state.velocity += impulse * rb.inverse_mass();
            state.angular_velocity += rb.inverse_inertia() * offset.perp_dot(impulse);
            true
        }
        _ => false,
    };
    if applied {
        wake_body(world, entity);
    }
    applied
}

/// Overwrite the linear velocity of a non-static body and wake it.
pub fn set_velocity(world: &mut hecs::World, entity: hecs::Entity, velocity: DVec2) -> bool {
    let applied = match world.query_one_mut::<(&RigidBody, &mut BodyState)>(entity) {
        Ok((rb, state)) if !rb.is_static() => {
            state.velocity = velocity;
            true
        }
        _ => false,
    };
    if applied {
        wake_body(world, entity);
    }
    applied
}

/// Builder for the component bundle of one body.
///
/// ```
/// use impulse2d::physics::rigid_body::BodyBuilder;
/// use impulse2d::ecs::components::physics::ColliderShape;
/// use impulse2d::glam::DVec2;
///
/// let mut world = impulse2d::hecs::World::new();
/// let ball = BodyBuilder::dynamic(ColliderShape::circle(0.5)?)
///     .position(DVec2::new(0.0, 3.0))
///     .mass(2.0)
///     .restitution(0.4)
///     .spawn(&mut world)?;
/// # let _ = ball;
/// # Ok::<(), impulse2d::PhysicsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BodyBuilder {
    body_type: RigidBodyType,
    shape: ColliderShape,
    mass: f64,
    restitution: f64,
    friction: f64,
    gravity_scale: Option<f64>,
    fixed_rotation: bool,
    position: DVec2,
    angle: f64,
    velocity: DVec2,
    angular_velocity: f64,
    sleep: SleepInfo,
}

impl BodyBuilder {
    pub fn new(body_type: RigidBodyType, shape: ColliderShape) -> Self {
        Self {
            body_type,
            shape,
            mass: 1.0,
            restitution: 1.0,
            friction: 0.8,
            gravity_scale: None,
            fixed_rotation: false,
            position: DVec2::ZERO,
            angle: 0.0,
            velocity: DVec2::ZERO,
            angular_velocity: 0.0,
            sleep: SleepInfo::new(),
        }
    }

    pub fn dynamic(shape: ColliderShape) -> Self {
        Self::new(RigidBodyType::Dynamic, shape)
    }

    pub fn fixed(shape: ColliderShape) -> Self {
        Self::new(RigidBodyType::Static, shape)
    }

    pub fn kinematic(shape: ColliderShape) -> Self {
        Self::new(RigidBodyType::Kinematic, shape)
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn gravity_scale(mut self, scale: f64) -> Self {
        self.gravity_scale = Some(scale);
        self
    }

    pub fn fixed_rotation(mut self) -> Self {
        self.fixed_rotation = true;
        self
    }

    pub fn position(mut self, position: DVec2) -> Self {
        self.position = position;
        self
    }

    pub fn angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Per-body dormancy limits. Zero keeps the scene default.
    pub fn sleep_limits(mut self, speed: f64, variance: f64, time: f64) -> Self {
        self.sleep = SleepInfo::with_limits(speed, variance, time);
        self
    }

    /// Validate and produce the component bundle.
    pub fn build(self) -> Result<(RigidBody, Collider, BodyState, SleepInfo)> {
        if let ColliderShape::Circle { radius } = self.shape {
            if !(radius > 0.0 && radius.is_finite()) {
                return Err(PhysicsError::InvalidRadius(radius));
            }
        }

        let mut rb = RigidBody::new(self.body_type, self.mass)?
            .with_restitution(self.restitution)?
            .with_friction(self.friction)?;
        rb = if self.fixed_rotation {
            rb.with_fixed_rotation()
        } else {
            rb.with_moment_of_inertia(self.shape.unit_moment_of_inertia() * self.mass)?
        };
        if let Some(scale) = self.gravity_scale {
            rb.gravity_scale = scale;
        }

        let state = BodyState::from_position(self.position)
            .with_angle(self.angle)
            .with_velocity(self.velocity)
            .with_angular_velocity(self.angular_velocity);

        Ok((rb, Collider { shape: self.shape }, state, self.sleep))
    }

    /// Build and spawn the body into `world`.
    pub fn spawn(self, world: &mut hecs::World) -> Result<hecs::Entity> {
        Ok(world.spawn(self.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::SleepState;

    const DT: f64 = 1.0 / 60.0;

    fn step(world: &mut hecs::World, gravity: DVec2) {
        apply_gravity(world, gravity);
        integrate_velocities(world, DT, 0.0);
        integrate_positions(world, DT);
    }

    #[test]
    fn test_free_fall_matches_closed_form() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::dynamic(ColliderShape::circle(0.5).unwrap())
            .position(DVec2::new(0.0, 10.0))
            .spawn(&mut world)
            .unwrap();

        let gravity = DVec2::new(0.0, -9.81);
        for _ in 0..60 {
            step(&mut world, gravity);
        }

        let state = *world.get::<&BodyState>(entity).unwrap();
        // y = y0 + a t^2 / 2 holds exactly for constant acceleration.
        let expected = 10.0 - 0.5 * 9.81 * 1.0;
        assert!((state.position.y - expected).abs() < 1e-9);
        assert!((state.velocity.y + 9.81).abs() < 1e-9);
        assert!(state.position.x.abs() < 1e-12);
        assert_eq!(state.acceleration, DVec2::ZERO);
    }

    #[test]
    fn test_static_body_unaffected() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::fixed(ColliderShape::circle(1.0).unwrap())
            .velocity(DVec2::new(3.0, 0.0))
            .spawn(&mut world)
            .unwrap();

        for _ in 0..10 {
            step(&mut world, DVec2::new(0.0, -9.81));
        }

        let state = *world.get::<&BodyState>(entity).unwrap();
        assert_eq!(state.position, DVec2::ZERO);
        assert_eq!(state.velocity, DVec2::ZERO);
    }

    #[test]
    fn test_kinematic_body_moves_without_gravity() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::kinematic(ColliderShape::circle(1.0).unwrap())
            .velocity(DVec2::new(1.0, 0.0))
            .spawn(&mut world)
            .unwrap();

        for _ in 0..60 {
            step(&mut world, DVec2::new(0.0, -9.81));
        }

        let state = *world.get::<&BodyState>(entity).unwrap();
        assert!((state.position - DVec2::new(1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_sleeping_body_not_integrated() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::dynamic(ColliderShape::circle(1.0).unwrap())
            .velocity(DVec2::new(1.0, 0.0))
            .spawn(&mut world)
            .unwrap();
        world.get::<&mut SleepInfo>(entity).unwrap().state = SleepState::Sleeping;

        step(&mut world, DVec2::new(0.0, -9.81));

        let state = *world.get::<&BodyState>(entity).unwrap();
        assert_eq!(state.position, DVec2::ZERO);
        assert_eq!(state.acceleration, DVec2::ZERO);
    }

    #[test]
    fn test_drag_damps_velocity() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::dynamic(ColliderShape::circle(1.0).unwrap())
            .velocity(DVec2::new(2.0, 0.0))
            .spawn(&mut world)
            .unwrap();
        world.get::<&mut BodyState>(entity).unwrap().angular_velocity = 3.0;

        integrate_velocities(&mut world, DT, 0.25);

        let state = *world.get::<&BodyState>(entity).unwrap();
        assert!((state.velocity.x - 1.5).abs() < 1e-12);
        assert_eq!(state.previous.velocity, DVec2::new(2.0, 0.0));
        // Drag is linear only.
        assert_eq!(state.angular_velocity, 3.0);
    }

    #[test]
    fn test_velocity_change_carries_into_position() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::dynamic(ColliderShape::circle(1.0).unwrap())
            .spawn(&mut world)
            .unwrap();

        integrate_velocities(&mut world, DT, 0.0);
        // A contact impulse between the two phases.
        world.get::<&mut BodyState>(entity).unwrap().velocity = DVec2::new(6.0, 0.0);
        integrate_positions(&mut world, DT);

        let state = *world.get::<&BodyState>(entity).unwrap();
        assert!((state.position.x - 0.1).abs() < 1e-12);
        assert_eq!(state.previous.position, DVec2::ZERO);
    }

    #[test]
    fn test_apply_force_off_center_spins() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::dynamic(ColliderShape::circle(1.0).unwrap())
            .mass(2.0)
            .spawn(&mut world)
            .unwrap();

        assert!(apply_force(&mut world, entity, DVec2::new(0.0, 4.0), DVec2::new(1.0, 0.0)));

        let state = *world.get::<&BodyState>(entity).unwrap();
        assert_eq!(state.acceleration, DVec2::new(0.0, 2.0));
        // I = m r^2 / 2 = 1, torque = 1 * 4 counter-clockwise.
        assert!((state.angular_acceleration - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_disturbance_wakes_body() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::dynamic(ColliderShape::circle(1.0).unwrap())
            .spawn(&mut world)
            .unwrap();
        world.get::<&mut SleepInfo>(entity).unwrap().state = SleepState::Sleeping;

        assert!(accelerate(&mut world, entity, DVec2::X));
        assert!(!world.get::<&SleepInfo>(entity).unwrap().is_sleeping());

        world.get::<&mut SleepInfo>(entity).unwrap().state = SleepState::Sleeping;
        assert!(set_velocity(&mut world, entity, DVec2::Y));
        assert!(!world.get::<&SleepInfo>(entity).unwrap().is_sleeping());

        world.get::<&mut SleepInfo>(entity).unwrap().state = SleepState::Sleeping;
        assert!(apply_impulse(&mut world, entity, DVec2::Y, DVec2::ZERO));
        assert!(!world.get::<&SleepInfo>(entity).unwrap().is_sleeping());
        assert_eq!(world.get::<&BodyState>(entity).unwrap().velocity, DVec2::new(0.0, 2.0));
    }

    #[test]
    fn test_forces_ignore_fixed_bodies() {
        let mut world = hecs::World::new();
        let entity = BodyBuilder::fixed(ColliderShape::circle(1.0).unwrap())
            .spawn(&mut world)
            .unwrap();
        assert!(!apply_force(&mut world, entity, DVec2::X, DVec2::ZERO));
        assert!(!accelerate(&mut world, entity, DVec2::X));
        assert!(!set_velocity(&mut world, entity, DVec2::X));
    }

    #[test]
    fn test_builder_validation() {
        let circle = ColliderShape::circle(1.0).unwrap();
        assert_eq!(
            BodyBuilder::dynamic(circle.clone()).mass(0.0).build().unwrap_err(),
            PhysicsError::NonPositiveMass(0.0)
        );
        assert!(BodyBuilder::dynamic(circle.clone()).restitution(2.0).build().is_err());
        assert!(BodyBuilder::dynamic(circle.clone()).friction(-1.0).build().is_err());
        assert!(BodyBuilder::dynamic(ColliderShape::Circle { radius: -1.0 }).build().is_err());

        let (rb, _, _, _) = BodyBuilder::dynamic(circle).mass(4.0).build().unwrap();
        assert!((rb.moment_of_inertia() - 2.0).abs() < 1e-12);
    }
}
