//! Rigid-body world
//!
//! Axis-aligned boxes integrated under gravity. Contacts are tracked between
//! steps so a pair reports "begin" once when the boxes first touch and
//! "separate" once when they part. Whether a contact is solid is decided by
//! whoever handles the begin event and is remembered for the life of the
//! contact.
//!
//! Screen coordinates: +x is right, +y is down (gravity is positive).

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Category, EntityId, EntityKind};
use crate::consts::{CONTACT_SLOP, SHALLOW_CONTACT};

/// How a body moves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Never moves (blocks, items, walls)
    Static,
    /// Integrated every step, optionally under gravity
    Dynamic { gravity: bool },
}

/// An axis-aligned box body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Centre position
    pub pos: Vec2,
    pub vel: Vec2,
    pub half: Vec2,
    pub mass: f32,
    pub motion: Motion,
}

impl Body {
    pub fn fixed(pos: Vec2, size: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            half: size / 2.0,
            mass: 0.0,
            motion: Motion::Static,
        }
    }

    pub fn dynamic(pos: Vec2, size: Vec2, mass: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            half: size / 2.0,
            mass,
            motion: Motion::Dynamic { gravity: true },
        }
    }

    /// Dynamic body that ignores gravity
    pub fn floating(pos: Vec2, size: Vec2, mass: f32) -> Self {
        Self {
            motion: Motion::Dynamic { gravity: false },
            ..Self::dynamic(pos, size, mass)
        }
    }

    pub fn size(&self) -> Vec2 {
        self.half * 2.0
    }

    pub fn min(&self) -> Vec2 {
        self.pos - self.half
    }

    pub fn max(&self) -> Vec2 {
        self.pos + self.half
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.motion, Motion::Dynamic { .. })
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        let min = self.min();
        let max = self.max();
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Distance from a point to the nearest point of the box (0 inside)
    pub fn distance_to(&self, point: Vec2) -> f32 {
        let nearest = point.clamp(self.min(), self.max());
        (point - nearest).length()
    }

    /// Overlap depth on each axis (negative means a gap)
    pub fn penetration(&self, other: &Body) -> Vec2 {
        (self.half + other.half) - (self.pos - other.pos).abs()
    }

    /// Overlapping or within contact slop on both axes
    pub fn touches(&self, other: &Body) -> bool {
        let pen = self.penetration(other);
        pen.x >= -CONTACT_SLOP && pen.y >= -CONTACT_SLOP
    }

    fn inverse_mass(&self) -> f32 {
        match self.motion {
            Motion::Static => 0.0,
            Motion::Dynamic { .. } if self.mass > 0.0 => 1.0 / self.mass,
            Motion::Dynamic { .. } => 1.0,
        }
    }
}

/// A thing in the world: what it is plus where it is
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub kind: EntityKind,
    pub body: Body,
}

impl Thing {
    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

/// Contact changes produced by one detection pass (id-ordered)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactEvents {
    pub began: Vec<(EntityId, EntityId)>,
    pub separated: Vec<(EntityId, EntityId)>,
}

/// Normalised pair key (lower id first)
fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// The physics world for one loaded level
#[derive(Debug, Clone)]
pub struct World {
    gravity: f32,
    pixel_size: Vec2,
    things: BTreeMap<EntityId, Thing>,
    /// Live contacts and whether each one is solid
    contacts: BTreeMap<(EntityId, EntityId), bool>,
    next_id: u32,
}

impl World {
    pub fn new(gravity: f32, pixel_size: Vec2) -> Self {
        Self {
            gravity,
            pixel_size,
            things: BTreeMap::new(),
            contacts: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    /// Level extent in world units
    pub fn pixel_size(&self) -> Vec2 {
        self.pixel_size
    }

    pub fn add(&mut self, kind: EntityKind, body: Body) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.things.insert(id, Thing { kind, body });
        id
    }

    /// Remove a thing immediately, dropping every contact that involves it
    pub fn remove(&mut self, id: EntityId) -> Option<Thing> {
        let thing = self.things.remove(&id)?;
        self.contacts.retain(|&(a, b), _| a != id && b != id);
        Some(thing)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.things.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Thing> {
        self.things.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Thing> {
        self.things.get_mut(&id)
    }

    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.things.get(&id).map(|t| &t.body)
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.things.get_mut(&id).map(|t| &mut t.body)
    }

    /// All things in id order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Thing)> {
        self.things.iter().map(|(id, thing)| (*id, thing))
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Whether a live contact exists between two things
    pub fn in_contact(&self, a: EntityId, b: EntityId) -> bool {
        self.contacts.contains_key(&pair_key(a, b))
    }

    /// Solidity recorded for a live contact
    pub fn contact_solid(&self, a: EntityId, b: EntityId) -> Option<bool> {
        self.contacts.get(&pair_key(a, b)).copied()
    }

    /// Record whether a contact should be physically resolved
    pub fn set_contact_solid(&mut self, a: EntityId, b: EntityId, solid: bool) {
        if let Some(entry) = self.contacts.get_mut(&pair_key(a, b)) {
            *entry = solid;
        }
    }

    /// Advance velocities and positions of dynamic bodies
    pub fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for thing in self.things.values_mut() {
            let body = &mut thing.body;
            if let Motion::Dynamic { gravity: falls } = body.motion {
                if falls {
                    body.vel.y += gravity * dt;
                }
                body.pos += body.vel * dt;
            }
        }
    }

    /// Find touching pairs and report which contacts began or ended
    ///
    /// New contacts start out solid until a begin handler says otherwise.
    pub fn detect_contacts(&mut self) -> ContactEvents {
        let mut current = BTreeSet::new();
        for (&id, thing) in &self.things {
            if !thing.body.is_dynamic() {
                continue;
            }
            for (&other_id, other) in &self.things {
                if other_id == id {
                    continue;
                }
                // Dynamic pairs are visited once, from the lower id
                if other.body.is_dynamic() && other_id < id {
                    continue;
                }
                if thing.body.touches(&other.body) {
                    current.insert(pair_key(id, other_id));
                }
            }
        }

        let mut events = ContactEvents::default();
        for key in &current {
            if !self.contacts.contains_key(key) {
                events.began.push(*key);
            }
        }
        for key in self.contacts.keys() {
            if !current.contains(key) {
                events.separated.push(*key);
            }
        }

        let previous = std::mem::take(&mut self.contacts);
        self.contacts = current
            .into_iter()
            .map(|key| (key, previous.get(&key).copied().unwrap_or(true)))
            .collect();

        events
    }

    /// Push apart every solid contact that is actually overlapping
    ///
    /// The push happens along the axis of least penetration and any velocity
    /// carrying the bodies further into each other is cancelled.
    pub fn resolve_contacts(&mut self) {
        let solid: Vec<(EntityId, EntityId)> = self
            .contacts
            .iter()
            .filter(|(_, solid)| **solid)
            .map(|(key, _)| *key)
            .collect();

        for (a_id, b_id) in solid {
            let (Some(a), Some(b)) = (self.body(a_id), self.body(b_id)) else {
                continue;
            };
            let (mut a, mut b) = (a.clone(), b.clone());
            if !separate_bodies(&mut a, &mut b) {
                continue;
            }
            if let Some(body) = self.body_mut(a_id) {
                *body = a;
            }
            if let Some(body) = self.body_mut(b_id) {
                *body = b;
            }
        }
    }

    /// Things whose box lies within `radius` of a point
    pub fn things_in_range(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        self.things
            .iter()
            .filter(|(_, thing)| thing.body.distance_to(center) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    /// First block whose box contains a point
    pub fn block_at(&self, point: Vec2) -> Option<EntityId> {
        self.things
            .iter()
            .find(|(_, thing)| {
                thing.category() == Category::Block && thing.body.contains_point(point)
            })
            .map(|(id, _)| *id)
    }
}

/// Positional and velocity correction for one overlapping pair
///
/// Returns false when there was nothing to do.
fn separate_bodies(a: &mut Body, b: &mut Body) -> bool {
    let pen = a.penetration(b);
    if pen.x <= 0.0 || pen.y <= 0.0 {
        return false;
    }
    let inv_a = a.inverse_mass();
    let inv_b = b.inverse_mass();
    let total = inv_a + inv_b;
    if total == 0.0 {
        return false;
    }

    let delta = a.pos - b.pos;
    // Shallow vertical overlaps resolve vertically so block seams never snag
    let (normal, depth) = if pen.y <= pen.x || pen.y <= SHALLOW_CONTACT {
        let dir = if delta.y > 0.0 { 1.0 } else { -1.0 };
        (Vec2::new(0.0, dir), pen.y)
    } else {
        let dir = if delta.x > 0.0 { 1.0 } else { -1.0 };
        (Vec2::new(dir, 0.0), pen.x)
    };

    a.pos += normal * depth * (inv_a / total);
    b.pos -= normal * depth * (inv_b / total);

    // Only cancel approach, never pull bodies together
    let approach = (a.vel - b.vel).dot(normal);
    if approach < 0.0 {
        let impulse = -approach / total;
        a.vel += normal * impulse * inv_a;
        b.vel -= normal * impulse * inv_b;
    }
    true
}
