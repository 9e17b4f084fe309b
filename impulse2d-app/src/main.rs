//! Headless demo: drops a handful of bodies onto a ramp and a floor and logs
//! where they end up.
//!
//! Usage: `RUST_LOG=info cargo run --manifest-path impulse2d-app/Cargo.toml -- [seconds]`
//! (`RUST_LOG=impulse2d=trace` shows the per-contact log of the library.)

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Context;
use glam::DVec2;
use impulse2d::prelude::*;

const FRAME: f64 = 1.0 / 60.0;

fn build_scene(world: &mut hecs::World) -> anyhow::Result<Vec<hecs::Entity>> {
    // Floor and a tilted ramp.
    BodyBuilder::fixed(ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(
        40.0, 2.0,
    )?))
    .position(DVec2::new(0.0, -1.0))
    .spawn(world)?;
    BodyBuilder::fixed(ColliderShape::ConvexPolygon(ConvexPolygon::rectangle(
        12.0, 0.5,
    )?))
    .position(DVec2::new(-6.0, 6.0))
    .angle(-0.3)
    .spawn(world)?;

    let mut bodies = Vec::new();
    for i in 0..6 {
        let x = -10.0 + i as f64 * 1.3;
        let y = 10.0 + (i % 3) as f64;
        let shape = if i % 2 == 0 {
            ColliderShape::circle(0.5)?
        } else {
            ColliderShape::ConvexPolygon(ConvexPolygon::new(&[
                DVec2::new(-0.5, -0.4),
                DVec2::new(0.5, -0.4),
                DVec2::new(0.0, 0.6),
            ])?)
        };
        let entity = BodyBuilder::dynamic(shape)
            .position(DVec2::new(x, y))
            .mass(1.0 + i as f64 * 0.25)
            .restitution(0.3)
            .friction(0.6)
            .spawn(world)
            .with_context(|| format!("spawning body {i}"))?;
        bodies.push(entity);
    }
    Ok(bodies)
}

fn report(world: &hecs::World, bodies: &[hecs::Entity], time: f64) {
    for (i, &entity) in bodies.iter().enumerate() {
        let Ok(mut query) = world.query_one::<(&BodyState, &SleepInfo)>(entity) else {
            continue;
        };
        if let Some((state, sleep)) = query.get() {
            log::info!(
                "t={time:5.2}s body {i}: pos=({:7.3}, {:7.3}) angle={:6.3} speed={:6.3}{}",
                state.position.x,
                state.position.y,
                state.angle,
                state.velocity.length(),
                if sleep.is_sleeping() { " (asleep)" } else { "" }
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let seconds: f64 = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid duration {arg:?}"))?,
        None => 5.0,
    };

    let mut world = hecs::World::new();
    let bodies = build_scene(&mut world)?;

    let mut physics = PhysicsWorld::new(PhysicsConfig::default().with_drag(0.001));

    let contact_frames = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&contact_frames);
    physics.subscribe_to(StepEventKind::ContactsDetected, move |_| {
        counter.set(counter.get() + 1)
    });

    let frames = (seconds / FRAME).round() as u32;
    log::info!("simulating {} bodies for {seconds}s ({frames} frames)", bodies.len());

    for frame in 0..frames {
        physics.step(&mut world, FRAME);
        if frame % 60 == 0 {
            report(&world, &bodies, frame as f64 * FRAME);
        }
    }
    report(&world, &bodies, seconds);

    let asleep = bodies
        .iter()
        .filter(|&&e| world.get::<&SleepInfo>(e).is_ok_and(|s| s.is_sleeping()))
        .count();
    log::info!(
        "done: {} ticks with contacts, {asleep}/{} bodies asleep",
        contact_frames.get(),
        bodies.len()
    );
    Ok(())
}
