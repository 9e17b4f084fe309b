//! Shared setup helpers for impulse2d benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use glam::DVec2;
use impulse2d::ecs::components::physics::ColliderShape;
use impulse2d::physics::contact::{Contact, ContactInfo};
use impulse2d::physics::geometry::ConvexPolygon;
use impulse2d::physics::rigid_body::BodyBuilder;
use impulse2d::physics::{PhysicsConfig, PhysicsWorld};

fn circle(radius: f64) -> anyhow::Result<ColliderShape> {
    Ok(ColliderShape::circle(radius)?)
}

fn square(side: f64) -> anyhow::Result<ColliderShape> {
    Ok(ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(
        side, side,
    )?))
}

fn grid_columns(n: usize) -> usize {
    (n as f64).sqrt().ceil().max(1.0) as usize
}

// ---------------------------------------------------------------------------
// Basic scenes
// ---------------------------------------------------------------------------

/// Spawn `n` dynamic circles in a grid so that neighbours overlap.
pub fn setup_circle_world(n: usize) -> anyhow::Result<hecs::World> {
    let mut world = hecs::World::new();
    let cols = grid_columns(n);

    for i in 0..n {
        let pos = DVec2::new((i % cols) as f64 * 1.5, (i / cols) as f64 * 1.5);
        BodyBuilder::dynamic(circle(1.0)?)
            .position(pos)
            .spawn(&mut world)?;
    }
    Ok(world)
}

/// Mixed scene: half dynamic circles, half fixed squares.
pub fn setup_mixed_world(n: usize) -> anyhow::Result<hecs::World> {
    let mut world = hecs::World::new();
    let cols = grid_columns(n);

    for i in 0..n {
        let pos = DVec2::new((i % cols) as f64 * 1.5, (i / cols) as f64 * 1.5);
        let builder = if i % 2 == 0 {
            BodyBuilder::dynamic(circle(1.0)?)
        } else {
            BodyBuilder::fixed(square(1.0)?)
        };
        builder.position(pos).spawn(&mut world)?;
    }
    Ok(world)
}

/// Sparse scene: bodies spread far apart (no overlaps).
pub fn setup_sparse_world(n: usize) -> anyhow::Result<hecs::World> {
    let mut world = hecs::World::new();
    let cols = grid_columns(n);

    for i in 0..n {
        let pos = DVec2::new((i % cols) as f64 * 10.0, (i / cols) as f64 * 10.0);
        BodyBuilder::dynamic(circle(0.5)?)
            .position(pos)
            .spawn(&mut world)?;
    }
    Ok(world)
}

/// Ground + `n` dynamic bodies above it (mixed circles and squares).
pub fn setup_scene(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let mut world = hecs::World::new();
    let physics = PhysicsWorld::new(PhysicsConfig::default());

    let ground = ConvexPolygon::rectangle(200.0, 1.0)?;
    BodyBuilder::fixed(ColliderShape::ConvexPolygon(ground))
        .position(DVec2::new(0.0, -0.5))
        .spawn(&mut world)?;

    let cols = grid_columns(n);
    for i in 0..n {
        let x = (i % cols) as f64 * 2.0 - cols as f64;
        let y = 1.0 + (i / cols) as f64 * 1.5;
        let shape = if i % 2 == 0 { circle(0.5)? } else { square(0.8)? };
        BodyBuilder::dynamic(shape)
            .position(DVec2::new(x, y))
            .restitution(0.2)
            .spawn(&mut world)?;
    }

    Ok((world, physics))
}

// ---------------------------------------------------------------------------
// Resolver setup
// ---------------------------------------------------------------------------

/// A column of circles resting on a fixed ground circle with pre-built
/// contacts between neighbours, all approaching.
pub fn setup_contacts(n: usize) -> anyhow::Result<(hecs::World, Vec<Contact>)> {
    let mut world = hecs::World::new();
    let mut entities = Vec::with_capacity(n + 1);

    entities.push(BodyBuilder::fixed(circle(0.5)?).spawn(&mut world)?);
    for i in 0..n {
        let entity = BodyBuilder::dynamic(circle(0.5)?)
            .position(DVec2::new(0.0, 0.99 * (i + 1) as f64))
            .velocity(DVec2::new(0.0, -1.0))
            .spawn(&mut world)?;
        entities.push(entity);
    }

    let contacts = entities
        .windows(2)
        .map(|pair| {
            let info = ContactInfo {
                normal: DVec2::Y,
                mtv: DVec2::new(0.0, 0.01),
                point: DVec2::new(0.0, 0.5),
                depth: 0.01,
            };
            Contact::new(pair[0], pair[1], info)
        })
        .collect();

    Ok((world, contacts))
}

// ---------------------------------------------------------------------------
// Mass physics scenario (continuous spawning)
// ---------------------------------------------------------------------------

const SPAWN_RADIUS: f64 = 8.0;
const SPAWN_HEIGHT: f64 = 15.0;

/// Spawn a single body at a deterministic position.
fn spawn_object(world: &mut hecs::World, index: usize) -> anyhow::Result<()> {
    let angle = (index * 137) as f64 * 0.01;
    let x = SPAWN_RADIUS * angle.cos();
    let y = SPAWN_HEIGHT + (index % 5) as f64 * 0.6;
    let shape = if index % 2 == 0 { circle(0.4)? } else { square(0.8)? };

    BodyBuilder::dynamic(shape)
        .position(DVec2::new(x, y))
        .restitution(0.3)
        .spawn(world)?;
    Ok(())
}

/// Ground + `initial` pre-existing falling bodies.
pub fn setup_mass_scene(initial: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let mut world = hecs::World::new();
    let physics = PhysicsWorld::new(PhysicsConfig::default());

    BodyBuilder::fixed(ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(
        40.0, 10.0,
    )?))
    .position(DVec2::new(0.0, -5.0))
    .spawn(&mut world)?;

    for i in 0..initial {
        spawn_object(&mut world, i)?;
    }

    Ok((world, physics))
}

/// Run `frames` frames, spawning `spawn_per_frame` bodies before each step.
pub fn run_mass_physics(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    frames: usize,
    spawn_per_frame: usize,
    start_index: usize,
) -> anyhow::Result<()> {
    let mut idx = start_index;
    for _ in 0..frames {
        for _ in 0..spawn_per_frame {
            spawn_object(world, idx)?;
            idx += 1;
        }
        physics.step(world, 1.0 / 60.0);
    }
    Ok(())
}
