//! Broadphase collision detection using sweep and prune over world AABBs.

use std::collections::HashMap;

use tracing::trace;

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::BodyState;

use super::contact::{CandidatePair, PairKey};

const AXIS_X: u8 = 0b01;
const AXIS_Y: u8 = 0b10;
const BOTH_AXES: u8 = AXIS_X | AXIS_Y;

#[derive(Debug, Clone, Copy)]
struct Interval {
    entity: hecs::Entity,
    min: [f64; 2],
    max: [f64; 2],
}

/// Sweep-and-prune broadphase.
///
/// Every entity with a `RigidBody`, a `Collider` and a `BodyState` is swept
/// on x, then on y. A pair is reported when its intervals overlap on both
/// axes, in the order the x sweep first found it. The struct only keeps
/// scratch buffers between calls.
#[derive(Debug, Default)]
pub struct SweepAndPrune {
    intervals: Vec<Interval>,
    flags: HashMap<PairKey, u8>,
    order: Vec<(hecs::Entity, hecs::Entity)>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find all pairs of entities whose world AABBs overlap.
    pub fn find_pairs(&mut self, world: &hecs::World) -> Vec<CandidatePair> {
        self.intervals.clear();
        self.flags.clear();
        self.order.clear();

        for (entity, (_rb, collider, state)) in world
            .query::<(&RigidBody, &Collider, &BodyState)>()
            .iter()
        {
            let aabb = collider.shape.aabb(state.angle).translated(state.position);
            let (min, max) = (aabb.min(), aabb.max());
            self.intervals.push(Interval {
                entity,
                min: [min.x, min.y],
                max: [max.x, max.y],
            });
        }

        for (axis, flag) in [(0, AXIS_X), (1, AXIS_Y)] {
            self.intervals.sort_by(|a, b| {
                a.min[axis]
                    .total_cmp(&b.min[axis])
                    .then_with(|| a.entity.cmp(&b.entity))
            });

            for i in 0..self.intervals.len() {
                let current = self.intervals[i];
                for other in &self.intervals[i + 1..] {
                    if other.min[axis] > current.max[axis] {
                        break;
                    }
                    let key = PairKey::new(current.entity, other.entity);
                    let bits = self.flags.entry(key).or_insert(0);
                    if *bits == 0 && flag == AXIS_X {
                        self.order.push((current.entity, other.entity));
                    }
                    *bits |= flag;
                }
            }
        }

        let candidates: Vec<CandidatePair> = self
            .order
            .iter()
            .filter(|(a, b)| self.flags.get(&PairKey::new(*a, *b)) == Some(&BOTH_AXES))
            .map(|&(entity_a, entity_b)| CandidatePair { entity_a, entity_b })
            .collect();

        trace!(
            bodies = self.intervals.len(),
            candidates = candidates.len(),
            "broadphase sweep"
        );
        candidates
    }
}
