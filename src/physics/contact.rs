//! Contact data structures for collision response.

use std::collections::HashSet;

use glam::DVec2;

/// Canonical, order-independent key for a pair of distinct entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(hecs::Entity, hecs::Entity);

impl PairKey {
    /// Canonical pair key (smaller entity first).
    ///
    /// # Panics
    ///
    /// Panics if `a == b`: a body never pairs with itself.
    pub fn new(a: hecs::Entity, b: hecs::Entity) -> Self {
        assert_ne!(a, b, "pair key built from a single entity {a:?}");
        if a < b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn first(&self) -> hecs::Entity {
        self.0
    }

    pub fn second(&self) -> hecs::Entity {
        self.1
    }
}

/// Broad-phase output: two bodies whose bounding boxes overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair {
    pub entity_a: hecs::Entity,
    pub entity_b: hecs::Entity,
}

impl CandidatePair {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.entity_a, self.entity_b)
    }
}

/// Geometric result of a shape-versus-shape test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B).
    pub normal: DVec2,
    /// Minimum translation vector. Moving B by `mtv` (or A by `-mtv`)
    /// separates the shapes.
    pub mtv: DVec2,
    /// Contact point as an offset from A's center, in world orientation.
    pub point: DVec2,
    /// Penetration depth, never negative.
    pub depth: f64,
}

/// A contact between two bodies, valid for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub entity_a: hecs::Entity,
    pub entity_b: hecs::Entity,
    pub normal: DVec2,
    pub mtv: DVec2,
    pub point: DVec2,
    pub depth: f64,
    /// The pair was already touching on the previous tick.
    pub persisted: bool,
}

impl Contact {
    pub fn new(entity_a: hecs::Entity, entity_b: hecs::Entity, info: ContactInfo) -> Self {
        Self {
            entity_a,
            entity_b,
            normal: info.normal,
            mtv: info.mtv,
            point: info.point,
            depth: info.depth,
            persisted: false,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.entity_a, self.entity_b)
    }
}

/// Remembers which pairs were in contact on the previous tick.
#[derive(Debug, Default)]
pub struct ContactTracker {
    previous: HashSet<PairKey>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self {
            previous: HashSet::new(),
        }
    }

    /// Flag contacts whose pair touched last tick, then remember this tick's
    /// pairs for the next call.
    pub fn update(&mut self, contacts: &mut [Contact]) {
        let mut current = HashSet::with_capacity(contacts.len());
        for contact in contacts.iter_mut() {
            let key = contact.key();
            contact.persisted = self.previous.contains(&key);
            current.insert(key);
        }
        self.previous = current;
    }

    pub fn was_touching(&self, a: hecs::Entity, b: hecs::Entity) -> bool {
        self.previous.contains(&PairKey::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }
}
