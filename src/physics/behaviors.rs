//! Force behaviors: scene-wide hooks that add acceleration before integration.

use glam::DVec2;

use crate::ecs::components::physics::{RigidBody, SleepInfo};
use crate::ecs::components::transform::BodyState;

/// A behavior runs once per tick, before the velocity phase.
///
/// Behaviors only accumulate acceleration on awake dynamic bodies.
pub trait ForceBehavior {
    fn apply(&mut self, world: &mut hecs::World);
}

/// Uniform acceleration on every awake dynamic body, independent of mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantAcceleration {
    pub acceleration: DVec2,
}

impl ConstantAcceleration {
    pub fn new(acceleration: DVec2) -> Self {
        Self { acceleration }
    }
}

impl ForceBehavior for ConstantAcceleration {
    fn apply(&mut self, world: &mut hecs::World) {
        for (_, (rb, state, sleep)) in
            world.query_mut::<(&RigidBody, &mut BodyState, Option<&SleepInfo>)>()
        {
            if rb.is_dynamic() && !sleep.is_some_and(|s| s.is_sleeping()) {
                state.acceleration += self.acceleration;
            }
        }
    }
}

/// Pairwise inverse-square attraction between awake dynamic bodies.
///
/// Pairs closer than `min_distance` or farther than `max_distance` are
/// ignored, which keeps near-coincident bodies from blowing up.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonianAttraction {
    pub strength: f64,
    min_distance_sq: f64,
    max_distance_sq: f64,
    bodies: Vec<(hecs::Entity, DVec2, f64)>,
    accelerations: Vec<DVec2>,
}

impl NewtonianAttraction {
    /// Attraction with a minimum distance of `10 * sqrt(strength)` and no
    /// maximum.
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            min_distance_sq: 100.0 * strength,
            max_distance_sq: f64::INFINITY,
            bodies: Vec::new(),
            accelerations: Vec::new(),
        }
    }

    pub fn with_distance_range(mut self, min: f64, max: f64) -> Self {
        self.set_distance_range(min, max);
        self
    }

    pub fn set_distance_range(&mut self, min: f64, max: f64) {
        self.min_distance_sq = min * min;
        self.max_distance_sq = max * max;
    }

    pub fn min_distance(&self) -> f64 {
        self.min_distance_sq.sqrt()
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance_sq.sqrt()
    }
}

impl ForceBehavior for NewtonianAttraction {
    fn apply(&mut self, world: &mut hecs::World) {
        self.bodies.clear();
        for (entity, (rb, state, sleep)) in world
            .query::<(&RigidBody, &BodyState, Option<&SleepInfo>)>()
            .iter()
        {
            if rb.is_dynamic() && !sleep.is_some_and(|s| s.is_sleeping()) {
                self.bodies.push((entity, state.position, rb.mass()));
            }
        }

        self.accelerations.clear();
        self.accelerations.resize(self.bodies.len(), DVec2::ZERO);

        for i in 0..self.bodies.len() {
            let (_, position, mass) = self.bodies[i];
            for j in 0..i {
                let (_, other_position, other_mass) = self.bodies[j];
                let offset = other_position - position;
                let distance_sq = offset.length_squared();
                if distance_sq <= self.min_distance_sq || distance_sq >= self.max_distance_sq {
                    continue;
                }
                let g = self.strength / distance_sq;
                let toward = offset / distance_sq.sqrt();
                self.accelerations[i] += toward * g * other_mass;
                self.accelerations[j] -= toward * g * mass;
            }
        }

        for (&(entity, _, _), &acceleration) in self.bodies.iter().zip(&self.accelerations) {
            if acceleration == DVec2::ZERO {
                continue;
            }
            if let Ok(mut state) = world.get::<&mut BodyState>(entity) {
                state.acceleration += acceleration;
            }
        }
    }
}

/// Pull toward a fixed point with magnitude `strength / distance^order`.
///
/// Bodies at most `min_distance` away or at least `max_distance` away are
/// left alone. Defaults: origin, strength 1, order 2, range (10, infinity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attractor {
    pub position: DVec2,
    pub strength: f64,
    pub order: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for Attractor {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            strength: 1.0,
            order: 2.0,
            min_distance: 10.0,
            max_distance: f64::INFINITY,
        }
    }
}

impl Attractor {
    pub fn new(position: DVec2, strength: f64) -> Self {
        Self {
            position,
            strength,
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    pub fn with_distance_range(mut self, min: f64, max: f64) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    /// Acceleration felt by a body at `at`, if it lies inside the range.
    pub fn acceleration_at(&self, at: DVec2) -> Option<DVec2> {
        let offset = self.position - at;
        let distance = offset.length();
        if distance <= self.min_distance || distance >= self.max_distance {
            return None;
        }
        Some(offset / distance * (self.strength / distance.powf(self.order)))
    }
}

impl ForceBehavior for Attractor {
    fn apply(&mut self, world: &mut hecs::World) {
        for (_, (rb, state, sleep)) in
            world.query_mut::<(&RigidBody, &mut BodyState, Option<&SleepInfo>)>()
        {
            if !rb.is_dynamic() || sleep.is_some_and(|s| s.is_sleeping()) {
                continue;
            }
            if let Some(acceleration) = self.acceleration_at(state.position) {
                state.acceleration += acceleration;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::SleepState;

    fn spawn(world: &mut hecs::World, rb: RigidBody, position: DVec2) -> hecs::Entity {
        world.spawn((rb, BodyState::from_position(position), SleepInfo::new()))
    }

    #[test]
    fn test_constant_acceleration_skips_fixed_and_sleeping() {
        let mut world = hecs::World::new();
        let moving = spawn(&mut world, RigidBody::new_dynamic(3.0).unwrap(), DVec2::ZERO);
        let fixed = spawn(&mut world, RigidBody::new_static(), DVec2::ZERO);
        let asleep = spawn(&mut world, RigidBody::new_dynamic(1.0).unwrap(), DVec2::ZERO);
        world.get::<&mut SleepInfo>(asleep).unwrap().state = SleepState::Sleeping;

        ConstantAcceleration::new(DVec2::new(0.0, -2.0)).apply(&mut world);

        assert_eq!(world.get::<&BodyState>(moving).unwrap().acceleration, DVec2::new(0.0, -2.0));
        assert_eq!(world.get::<&BodyState>(fixed).unwrap().acceleration, DVec2::ZERO);
        assert_eq!(world.get::<&BodyState>(asleep).unwrap().acceleration, DVec2::ZERO);
    }

    #[test]
    fn test_newtonian_pulls_bodies_together() {
        let mut world = hecs::World::new();
        let a = spawn(&mut world, RigidBody::new_dynamic(1.0).unwrap(), DVec2::ZERO);
        let b = spawn(&mut world, RigidBody::new_dynamic(4.0).unwrap(), DVec2::new(10.0, 0.0));

        let mut gravity = NewtonianAttraction::new(0.5);
        gravity.apply(&mut world);

        // g = 0.5 / 100; a is pulled by b's mass, b by a's mass.
        let acc_a = world.get::<&BodyState>(a).unwrap().acceleration;
        let acc_b = world.get::<&BodyState>(b).unwrap().acceleration;
        assert!((acc_a - DVec2::new(0.02, 0.0)).length() < 1e-12);
        assert!((acc_b - DVec2::new(-0.005, 0.0)).length() < 1e-12);

        // Momentum change balances: m_a * acc_a + m_b * acc_b = 0.
        assert!((acc_a * 1.0 + acc_b * 4.0).length() < 1e-12);
    }

    #[test]
    fn test_newtonian_distance_range() {
        let mut world = hecs::World::new();
        let a = spawn(&mut world, RigidBody::new_dynamic(1.0).unwrap(), DVec2::ZERO);
        spawn(&mut world, RigidBody::new_dynamic(1.0).unwrap(), DVec2::new(2.0, 0.0));

        // Default minimum distance for strength 1 is 10.
        let mut gravity = NewtonianAttraction::new(1.0);
        assert!((gravity.min_distance() - 10.0).abs() < 1e-12);
        gravity.apply(&mut world);
        assert_eq!(world.get::<&BodyState>(a).unwrap().acceleration, DVec2::ZERO);

        let mut gravity = NewtonianAttraction::new(1.0).with_distance_range(1.0, 1.5);
        gravity.apply(&mut world);
        assert_eq!(world.get::<&BodyState>(a).unwrap().acceleration, DVec2::ZERO);

        let mut gravity = NewtonianAttraction::new(1.0).with_distance_range(1.0, 3.0);
        gravity.apply(&mut world);
        assert!(world.get::<&BodyState>(a).unwrap().acceleration.x > 0.0);
    }

    #[test]
    fn test_attractor_inverse_square_toward_point() {
        let mut world = hecs::World::new();
        let far = spawn(&mut world, RigidBody::new_dynamic(5.0).unwrap(), DVec2::new(20.0, 0.0));
        let near = spawn(&mut world, RigidBody::new_dynamic(1.0).unwrap(), DVec2::new(5.0, 0.0));
        let fixed = spawn(&mut world, RigidBody::new_static(), DVec2::new(0.0, 20.0));

        Attractor::default().apply(&mut world);

        // 1 / 20^2 toward the origin, whatever the mass.
        let acc = world.get::<&BodyState>(far).unwrap().acceleration;
        assert!((acc - DVec2::new(-0.0025, 0.0)).length() < 1e-12);
        assert_eq!(world.get::<&BodyState>(near).unwrap().acceleration, DVec2::ZERO);
        assert_eq!(world.get::<&BodyState>(fixed).unwrap().acceleration, DVec2::ZERO);
    }

    #[test]
    fn test_attractor_order_and_range() {
        let attractor = Attractor::new(DVec2::new(0.0, 10.0), 4.0)
            .with_order(1.0)
            .with_distance_range(1.0, 5.0);
        let acc = attractor.acceleration_at(DVec2::new(0.0, 8.0)).unwrap();
        assert!((acc - DVec2::new(0.0, 2.0)).length() < 1e-12);
        assert!(attractor.acceleration_at(DVec2::new(0.0, 9.5)).is_none());
        assert!(attractor.acceleration_at(DVec2::new(0.0, 0.0)).is_none());
    }
}
