//! Sequential impulse contact resolver.
//!
//! Each contact gets exactly one pass, in the order the narrow phase produced
//! them: positional correction along the minimum translation vector, then a
//! normal impulse with restitution, then a Coulomb friction impulse.

use glam::DVec2;
use tracing::{debug, trace};

use crate::ecs::components::physics::{RigidBody, SleepInfo};
use crate::ecs::components::transform::BodyState;

use super::contact::Contact;
use super::dormancy::wake_body;

/// Positional correction tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Squared MTV length below which the correction is damped.
    pub mtv_threshold: f64,
    /// Fraction of a small MTV that is actually applied.
    pub body_extract_dropoff: f64,
    /// Wake both bodies when the MTV is at or above the threshold.
    pub force_wakeup_above_overlap_threshold: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mtv_threshold: 1.0,
            body_extract_dropoff: 0.5,
            force_wakeup_above_overlap_threshold: true,
        }
    }
}

/// Resolve every contact once. Returns how many contacts received an
/// impulse.
pub fn resolve_contacts(
    world: &mut hecs::World,
    contacts: &[Contact],
    config: &ResolverConfig,
) -> usize {
    let mut resolved = 0;
    for contact in contacts {
        if resolve_contact(world, contact, config) {
            resolved += 1;
        }
    }
    debug!(contacts = contacts.len(), resolved, "contacts resolved");
    resolved
}

fn resolve_contact(world: &mut hecs::World, contact: &Contact, config: &ResolverConfig) -> bool {
    let (Some(a), Some(b)) = (
        RbData::read(world, contact.entity_a),
        RbData::read(world, contact.entity_b),
    ) else {
        return false;
    };

    // Skip if both are static/kinematic
    if !a.dynamic && !b.dynamic {
        return false;
    }

    let mut pos_a = a.position;
    let mut pos_b = b.position;

    if !contact.persisted {
        let mut mtv = contact.mtv;
        if mtv.length_squared() < config.mtv_threshold {
            mtv *= config.body_extract_dropoff;
        } else if config.force_wakeup_above_overlap_threshold {
            wake_body(world, contact.entity_a);
            wake_body(world, contact.entity_b);
        }

        let (shift_a, shift_b) = if !a.dynamic {
            (DVec2::ZERO, mtv)
        } else if !b.dynamic {
            (-mtv, DVec2::ZERO)
        } else {
            (-mtv * 0.5, mtv * 0.5)
        };
        translate_body(world, contact.entity_a, shift_a);
        translate_body(world, contact.entity_b, shift_b);
        pos_a += shift_a;
        pos_b += shift_b;
    }

    let normal = contact.normal;
    let r_a = contact.point;
    let r_b = r_a + pos_a - pos_b;

    let relative_velocity = b.velocity_at(r_b) - a.velocity_at(r_a);
    let normal_velocity = relative_velocity.dot(normal);

    // Separating or resting: no energy is added.
    if normal_velocity >= 0.0 {
        return false;
    }

    let restitution = if contact.persisted {
        0.0
    } else {
        a.restitution * b.restitution
    };
    let friction = a.friction * b.friction;

    let r_a_cross_n = r_a.perp_dot(normal);
    let r_b_cross_n = r_b.perp_dot(normal);
    let inv_mass_sum = a.inv_mass
        + b.inv_mass
        + a.inv_inertia * r_a_cross_n * r_a_cross_n
        + b.inv_inertia * r_b_cross_n * r_b_cross_n;

    if inv_mass_sum <= 0.0 {
        return false;
    }

    let j_normal = -(1.0 + restitution) * normal_velocity / inv_mass_sum;
    apply_impulse(world, contact.entity_a, contact.entity_b, normal * j_normal, r_a, r_b);

    // Friction impulse
    // Re-read velocities after normal impulse
    if friction != 0.0 {
        if let (Some(a), Some(b)) = (
            RbData::read(world, contact.entity_a),
            RbData::read(world, contact.entity_b),
        ) {
            let rel_vel = b.velocity_at(r_b) - a.velocity_at(r_a);
            let tangent_vel = rel_vel - normal * rel_vel.dot(normal);
            let tangent_len = tangent_vel.length();

            if tangent_len > 0.0 {
                let tangent = tangent_vel / tangent_len;
                let r_a_cross_t = r_a.perp_dot(tangent);
                let r_b_cross_t = r_b.perp_dot(tangent);
                let inv_mass_t = a.inv_mass
                    + b.inv_mass
                    + a.inv_inertia * r_a_cross_t * r_a_cross_t
                    + b.inv_inertia * r_b_cross_t * r_b_cross_t;

                if inv_mass_t > 0.0 {
                    // Impulse that stops the sliding entirely.
                    let max_impulse = tangent_len / inv_mass_t;
                    let kinetic = friction * j_normal.abs();
                    let j_tangent = if kinetic >= max_impulse {
                        max_impulse
                    } else {
                        kinetic
                    };
                    apply_impulse(
                        world,
                        contact.entity_a,
                        contact.entity_b,
                        -tangent * j_tangent,
                        r_a,
                        r_b,
                    );
                }
            }
        }
    }

    if a.asleep {
        wake_body(world, contact.entity_a);
    }
    if b.asleep {
        wake_body(world, contact.entity_b);
    }

    trace!(
        entity_a = ?contact.entity_a,
        entity_b = ?contact.entity_b,
        j_normal,
        persisted = contact.persisted,
        "contact resolved"
    );
    true
}

/// Body data copied out of the world for solver calculations.
#[derive(Debug, Clone, Copy)]
struct RbData {
    dynamic: bool,
    inv_mass: f64,
    inv_inertia: f64,
    position: DVec2,
    velocity: DVec2,
    angular_velocity: f64,
    restitution: f64,
    friction: f64,
    asleep: bool,
}

impl RbData {
    fn read(world: &hecs::World, entity: hecs::Entity) -> Option<Self> {
        let rb = world.get::<&RigidBody>(entity).ok()?;
        let state = world.get::<&BodyState>(entity).ok()?;
        let asleep = world
            .get::<&SleepInfo>(entity)
            .map(|sleep| sleep.is_sleeping())
            .unwrap_or(false);
        Some(Self {
            dynamic: rb.is_dynamic(),
            inv_mass: rb.inverse_mass(),
            inv_inertia: rb.inverse_inertia(),
            position: state.position,
            velocity: state.velocity,
            angular_velocity: state.angular_velocity,
            restitution: rb.restitution(),
            friction: rb.friction(),
            asleep,
        })
    }

    #[inline]
    fn velocity_at(&self, offset: DVec2) -> DVec2 {
        self.velocity + offset.perp() * self.angular_velocity
    }
}

fn translate_body(world: &mut hecs::World, entity: hecs::Entity, offset: DVec2) {
    if offset == DVec2::ZERO {
        return;
    }
    if let Ok(mut state) = world.get::<&mut BodyState>(entity) {
        state.translate(offset);
    }
}

/// Apply `impulse` to B and its negation to A at the given contact offsets.
fn apply_impulse(
    world: &mut hecs::World,
    entity_a: hecs::Entity,
    entity_b: hecs::Entity,
    impulse: DVec2,
    r_a: DVec2,
    r_b: DVec2,
) {
    apply_body_impulse(world, entity_a, -impulse, r_a);
    apply_body_impulse(world, entity_b, impulse, r_b);
}

fn apply_body_impulse(world: &mut hecs::World, entity: hecs::Entity, impulse: DVec2, r: DVec2) {
    let (inv_mass, inv_inertia) = match world.get::<&RigidBody>(entity) {
        Ok(rb) if rb.is_dynamic() => (rb.inverse_mass(), rb.inverse_inertia()),
        _ => return,
    };
    if let Ok(mut state) = world.get::<&mut BodyState>(entity) {
        state.velocity += impulse * inv_mass;
        state.angular_velocity += inv_inertia * r.perp_dot(impulse);
    }
}
