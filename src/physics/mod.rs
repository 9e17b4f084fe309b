//! CPU rigid body simulation and collision detection in 2D.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop:
//!
//! 1. Apply forces (behaviors, gravity)
//! 2. Integrate velocities
//! 3. Broadphase collision detection (sweep and prune)
//! 4. Narrowphase collision detection (closed-form circles, GJK)
//! 5. Resolve contacts (positional correction, sequential impulse)
//! 6. Update sleep states
//! 7. Integrate positions

pub mod behaviors;
pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod dormancy;
pub mod events;
pub mod geometry;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use glam::DVec2;
use tracing::trace;

use crate::error::{PhysicsError, Result};

use self::behaviors::ForceBehavior;
use self::broadphase::SweepAndPrune;
use self::contact::{CandidatePair, Contact, ContactTracker};
use self::events::{EventBus, StepEvent, StepEventKind, SubscriptionId};
use self::narrowphase::detect_contacts;

pub use self::dormancy::SleepConfig;
pub use self::solver::ResolverConfig;

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81).
    pub gravity: DVec2,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Fraction of velocity removed per tick. Default: 0.
    pub drag: f64,
    pub sleep: SleepConfig,
    pub resolver: ResolverConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DVec2::new(0.0, -9.81),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            drag: 0.0,
            sleep: SleepConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl PhysicsConfig {
    pub fn with_gravity(mut self, gravity: DVec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_fixed_timestep(mut self, fixed_timestep: f64) -> Result<Self> {
        if !(fixed_timestep > 0.0 && fixed_timestep.is_finite()) {
            return Err(PhysicsError::InvalidTimestep(fixed_timestep));
        }
        self.fixed_timestep = fixed_timestep;
        Ok(self)
    }

    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    pub fn with_drag(mut self, drag: f64) -> Self {
        self.drag = drag;
        self
    }

    pub fn with_sleep(mut self, sleep: SleepConfig) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

/// The main physics world managing simulation state.
///
/// Bodies live in a `hecs::World` owned by the caller; this struct only
/// keeps per-tick buffers, the contact history, behaviors and subscribers.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    broadphase: SweepAndPrune,
    tracker: ContactTracker,
    candidates: Vec<CandidatePair>,
    contacts: Vec<Contact>,
    behaviors: Vec<Box<dyn ForceBehavior>>,
    events: EventBus,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            broadphase: SweepAndPrune::new(),
            tracker: ContactTracker::new(),
            candidates: Vec::new(),
            contacts: Vec::new(),
            behaviors: Vec::new(),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PhysicsConfig {
        &mut self.config
    }

    /// Contacts produced by the last tick, in resolution order.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Candidate pairs produced by the last tick's broad phase.
    pub fn candidates(&self) -> &[CandidatePair] {
        &self.candidates
    }

    pub fn contact_tracker(&self) -> &ContactTracker {
        &self.tracker
    }

    /// Behaviors run in insertion order at the start of every tick.
    pub fn add_behavior(&mut self, behavior: Box<dyn ForceBehavior>) {
        self.behaviors.push(behavior);
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&StepEvent<'_>) + 'static,
    {
        self.events.subscribe(handler)
    }

    pub fn subscribe_to<F>(&mut self, kind: StepEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&StepEvent<'_>) + 'static,
    {
        self.events.subscribe_to(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    /// Returns the number of fixed ticks that ran.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) -> u32 {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(world);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }
        substeps
    }

    /// Run exactly one tick of `fixed_timestep` seconds.
    pub fn fixed_step(&mut self, world: &mut hecs::World) {
        let dt = self.config.fixed_timestep;

        // 1. Apply forces
        for behavior in &mut self.behaviors {
            behavior.apply(world);
        }
        if self.config.gravity != DVec2::ZERO {
            rigid_body::apply_gravity(world, self.config.gravity);
        }

        // 2. Integrate velocities
        rigid_body::integrate_velocities(world, dt, self.config.drag);
        self.events.emit(&StepEvent::VelocitiesIntegrated { dt });

        // 3. Broadphase collision detection
        self.candidates = self.broadphase.find_pairs(world);
        if !self.candidates.is_empty() {
            self.events
                .emit(&StepEvent::CandidatesProduced(&self.candidates));
        }

        // 4. Narrowphase collision detection
        detect_contacts(world, &self.candidates, &mut self.contacts);
        self.tracker.update(&mut self.contacts);
        if !self.contacts.is_empty() {
            self.events.emit(&StepEvent::ContactsDetected(&self.contacts));
        }

        // 5. Resolve contacts
        let resolved = solver::resolve_contacts(world, &self.contacts, &self.config.resolver);

        // 6. Update sleep states
        dormancy::update_sleep_states(world, dt, &self.config.sleep);

        // 7. Integrate positions
        rigid_body::integrate_positions(world, dt);
        self.events.emit(&StepEvent::PositionsIntegrated { dt });

        trace!(
            candidates = self.candidates.len(),
            contacts = self.contacts.len(),
            resolved,
            "physics tick"
        );
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("accumulator", &self.accumulator)
            .field("contacts", &self.contacts.len())
            .field("behaviors", &self.behaviors.len())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::ColliderShape;
    use crate::ecs::components::transform::BodyState;
    use crate::physics::behaviors::ConstantAcceleration;
    use crate::physics::geometry::ConvexPolygon;
    use crate::physics::rigid_body::BodyBuilder;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn circle(radius: f64) -> ColliderShape {
        ColliderShape::circle(radius).unwrap()
    }

    #[test]
    fn test_physics_world_free_fall() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());

        let entity = BodyBuilder::dynamic(circle(0.5))
            .position(DVec2::new(0.0, 10.0))
            .spawn(&mut world)
            .unwrap();

        // Simulate ~1 second
        for _ in 0..60 {
            physics.step(&mut world, 1.0 / 60.0);
        }

        let state = world.get::<&BodyState>(entity).unwrap();
        assert!(
            (state.position.y - (10.0 - 0.5 * 9.81)).abs() < 1e-6,
            "Body should follow free fall: y = {}",
            state.position.y
        );
    }

    #[test]
    fn test_physics_world_collision() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());

        // Dynamic ball falling
        let ball = BodyBuilder::dynamic(circle(0.5))
            .position(DVec2::new(0.0, 2.0))
            .restitution(0.0)
            .spawn(&mut world)
            .unwrap();

        // Static ground with its top surface at y = 0
        let ground = ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(20.0, 1.0).unwrap());
        BodyBuilder::fixed(ground)
            .position(DVec2::new(0.0, -0.5))
            .spawn(&mut world)
            .unwrap();

        // Simulate 3 seconds
        for _ in 0..180 {
            physics.step(&mut world, 1.0 / 60.0);
        }

        let state = world.get::<&BodyState>(ball).unwrap();
        assert!(
            state.position.y > 0.0,
            "Ball should not have fallen through the ground: y = {}",
            state.position.y
        );
        assert!(
            state.position.y < 1.0,
            "Ball should have come to rest on the ground: y = {}",
            state.position.y
        );
        assert!(state.velocity.length() < 1.0);
    }

    #[test]
    fn test_physics_world_separates_stacked_squares() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default().with_gravity(DVec2::ZERO));
        let square = || ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(2.0, 2.0).unwrap());

        // Spawned on exactly the same spot.
        let a = BodyBuilder::dynamic(square())
            .position(DVec2::new(1.0, 1.0))
            .spawn(&mut world)
            .unwrap();
        let b = BodyBuilder::dynamic(square())
            .position(DVec2::new(1.0, 1.0))
            .spawn(&mut world)
            .unwrap();

        physics.fixed_step(&mut world);
        assert_eq!(physics.contacts().len(), 1);

        for _ in 0..10 {
            physics.fixed_step(&mut world);
        }
        let pa = world.get::<&BodyState>(a).unwrap().position;
        let pb = world.get::<&BodyState>(b).unwrap().position;
        assert!((pa.x - pb.x).abs() > 1.9, "squares still overlap: {pa} {pb}");
        assert!((pa.y - 1.0).abs() < 1e-9 && (pb.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_physics_world_events_in_tick_order() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default().with_gravity(DVec2::ZERO));

        BodyBuilder::dynamic(circle(1.0)).spawn(&mut world).unwrap();
        BodyBuilder::dynamic(circle(1.0))
            .position(DVec2::new(1.5, 0.0))
            .spawn(&mut world)
            .unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        physics.subscribe(move |event| sink.borrow_mut().push(event.kind()));

        physics.fixed_step(&mut world);

        assert_eq!(
            *log.borrow(),
            vec![
                StepEventKind::VelocitiesIntegrated,
                StepEventKind::CandidatesProduced,
                StepEventKind::ContactsDetected,
                StepEventKind::PositionsIntegrated,
            ]
        );
        assert_eq!(physics.candidates().len(), 1);
        assert_eq!(physics.contacts().len(), 1);
        assert!(!physics.contacts()[0].persisted);
    }

    #[test]
    fn test_physics_world_skips_empty_events() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        BodyBuilder::dynamic(circle(1.0)).spawn(&mut world).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        physics.subscribe(move |event| sink.borrow_mut().push(event.kind()));
        physics.fixed_step(&mut world);

        assert_eq!(
            *log.borrow(),
            vec![
                StepEventKind::VelocitiesIntegrated,
                StepEventKind::PositionsIntegrated
            ]
        );
    }

    #[test]
    fn test_physics_world_substeps_and_clamp() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());

        assert_eq!(physics.step(&mut world, 1.0 / 30.0), 2);
        assert_eq!(physics.step(&mut world, 0.001), 0);
        // A long frame runs at most max_substeps ticks and drops the rest.
        assert_eq!(physics.step(&mut world, 1.0), 4);
        assert_eq!(physics.step(&mut world, 0.0), 0);
    }

    #[test]
    fn test_physics_world_behaviors_run_each_tick() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(PhysicsConfig::default().with_gravity(DVec2::ZERO));
        physics.add_behavior(Box::new(ConstantAcceleration::new(DVec2::new(6.0, 0.0))));

        let entity = BodyBuilder::dynamic(circle(1.0)).spawn(&mut world).unwrap();
        for _ in 0..10 {
            physics.fixed_step(&mut world);
        }

        let state = world.get::<&BodyState>(entity).unwrap();
        assert!((state.velocity.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_physics_config_default() {
        let config = PhysicsConfig::default();
        assert_eq!(config.gravity, DVec2::new(0.0, -9.81));
        assert!((config.fixed_timestep - 1.0 / 60.0).abs() < 1e-10);
        assert_eq!(config.max_substeps, 4);
        assert_eq!(config.drag, 0.0);
        assert!(config.sleep.enabled);
    }

    #[test]
    fn test_physics_config_rejects_bad_timestep() {
        assert_eq!(
            PhysicsConfig::default().with_fixed_timestep(0.0).unwrap_err(),
            PhysicsError::InvalidTimestep(0.0)
        );
        assert!(PhysicsConfig::default().with_fixed_timestep(-1.0).is_err());
        assert!(PhysicsConfig::default().with_fixed_timestep(0.01).is_ok());
    }
}
