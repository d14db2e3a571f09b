//! Game state and the physics step
//!
//! `GameState` owns everything the tick thread mutates: the world of the
//! current level, the persistent player stats, pending timers and the event
//! queue read by the HUD. Collision handlers run synchronously inside
//! [`GameState::step_physics`] and see removals made by earlier handlers in
//! the same step.

use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::classify;
use super::dispatch::HandlerTable;
use super::entity::{Block, EntityId, EntityKind, ItemKind, Mob, MobKind, Player};
use super::reactions;
use super::timers::{Clock, Effect, Scheduler};
use super::world::{Body, Thing, World};
use crate::consts::*;

/// Player box side in world units
pub const PLAYER_SIZE: f32 = 16.0;

/// Things the HUD, audio or logs may want to know about
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Health, score or invincibility changed
    StatusChanged,
    LevelLoaded(String),
    ItemCollected(ItemKind),
    ItemDropped(ItemKind),
    MobDefeated(MobKind),
    BricksVanished(usize),
    BricksRestored(usize),
    InvincibilityEnded,
    GoalReached,
}

/// Complete simulation state for the running game
pub struct GameState {
    level: String,
    pub world: World,
    pub player: Player,
    player_id: EntityId,
    pub scheduler: Scheduler,
    goal_reached: bool,
    events: Vec<GameEvent>,
    handlers: HandlerTable,
    clock: Box<dyn Clock>,
    pub(crate) rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl GameState {
    /// Create a state around an already built level world
    pub fn new(
        level: impl Into<String>,
        world: World,
        player: Player,
        spawn: Vec2,
        mass: f32,
        clock: Box<dyn Clock>,
        seed: u64,
    ) -> Self {
        let mut state = Self {
            level: String::new(),
            world: World::new(0.0, Vec2::ZERO),
            player,
            player_id: EntityId(0),
            scheduler: Scheduler::new(),
            goal_reached: false,
            events: Vec::new(),
            handlers: HandlerTable::standard(),
            clock,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
        };
        state.install_world(level, world, spawn, mass);
        state
    }

    /// Swap in a freshly built level, keeping the player's stats
    ///
    /// Timers bound to entities of the old world are dropped; invincibility
    /// carries over.
    pub fn install_world(&mut self, level: impl Into<String>, mut world: World, spawn: Vec2, mass: f32) {
        self.player_id = world.add(
            EntityKind::Player,
            Body::dynamic(spawn, Vec2::splat(PLAYER_SIZE), mass),
        );
        self.world = world;
        self.level = level.into();
        self.scheduler.cancel_entity_timers();
        self.goal_reached = false;
        self.player.set_grown(false);
        self.events.push(GameEvent::LevelLoaded(self.level.clone()));
        self.events.push(GameEvent::StatusChanged);
    }

    /// Name of the loaded level
    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn player_id(&self) -> EntityId {
        self.player_id
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Replace the collision handler table (tests, mods)
    pub fn set_handlers(&mut self, handlers: HandlerTable) {
        self.handlers = handlers;
    }

    pub fn player_body(&self) -> Option<&Body> {
        self.world.body(self.player_id)
    }

    pub fn player_body_mut(&mut self) -> Option<&mut Body> {
        self.world.body_mut(self.player_id)
    }

    pub fn player_velocity(&self) -> Vec2 {
        self.player_body().map(|b| b.vel).unwrap_or(Vec2::ZERO)
    }

    pub fn set_player_velocity(&mut self, vel: Vec2) {
        if let Some(body) = self.player_body_mut() {
            body.vel = vel;
        }
    }

    pub fn mob(&self, id: EntityId) -> Option<&Mob> {
        match self.world.get(id) {
            Some(Thing {
                kind: EntityKind::Mob(mob),
                ..
            }) => Some(mob),
            _ => None,
        }
    }

    pub fn mob_mut(&mut self, id: EntityId) -> Option<&mut Mob> {
        match self.world.get_mut(id) {
            Some(Thing {
                kind: EntityKind::Mob(mob),
                ..
            }) => Some(mob),
            _ => None,
        }
    }

    pub fn block(&self, id: EntityId) -> Option<&Block> {
        match self.world.get(id) {
            Some(Thing {
                kind: EntityKind::Block(block),
                ..
            }) => Some(block),
            _ => None,
        }
    }

    pub fn block_mut(&mut self, id: EntityId) -> Option<&mut Block> {
        match self.world.get_mut(id) {
            Some(Thing {
                kind: EntityKind::Block(block),
                ..
            }) => Some(block),
            _ => None,
        }
    }

    /// Remove a thing now and cancel any timer that refers to it
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Thing> {
        let thing = self.world.remove(id)?;
        self.scheduler.cancel_target(id);
        log::debug!("removed {} {:?}", thing.kind.name(), id);
        Some(thing)
    }

    /// Make the player invincible, restarting the expiry timer
    pub fn activate_invincibility(&mut self) {
        let now = self.now();
        self.player.set_invincible(now);
        self.scheduler
            .schedule(Effect::InvincibilityExpiry, now, INVINCIBILITY_SECS);
    }

    pub(crate) fn flag_goal_reached(&mut self) {
        if !self.goal_reached {
            self.goal_reached = true;
            self.events.push(GameEvent::GoalReached);
        }
    }

    /// Consume the goal flag set by a side contact with a goal
    pub fn take_goal_reached(&mut self) -> bool {
        std::mem::take(&mut self.goal_reached)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the world one step, firing collision handlers as contacts
    /// begin and end
    pub fn step_physics(&mut self, dt: f32) {
        self.step_mobs(dt);
        self.world.integrate(dt);

        let events = self.world.detect_contacts();
        for (a, b) in events.began {
            // An earlier handler in this step may have removed either side
            if !self.world.contains(a) || !self.world.contains(b) {
                continue;
            }
            let solid = self.dispatch_begin(a, b);
            self.world.set_contact_solid(a, b, solid);
        }
        for (a, b) in events.separated {
            if self.world.contains(a) && self.world.contains(b) {
                self.dispatch_separate(a, b);
            }
        }

        self.world.resolve_contacts();
    }

    fn dispatch_begin(&mut self, a: EntityId, b: EntityId) -> bool {
        let (Some(ta), Some(tb)) = (self.world.get(a), self.world.get(b)) else {
            return false;
        };
        let Some((handler, swapped)) = self.handlers.begin_for(ta.category(), tb.category())
        else {
            // Unhandled pairs (walls, placeholders) behave as plain solids
            return true;
        };
        let (first, second) = if swapped { (tb, ta) } else { (ta, tb) };
        let direction = classify(&first.body, &second.body);
        let (first, second) = if swapped { (b, a) } else { (a, b) };
        handler(self, first, second, direction)
    }

    fn dispatch_separate(&mut self, a: EntityId, b: EntityId) {
        let (Some(ta), Some(tb)) = (self.world.get(a), self.world.get(b)) else {
            return;
        };
        if let Some((handler, swapped)) = self.handlers.separate_for(ta.category(), tb.category()) {
            let (first, second) = if swapped { (b, a) } else { (a, b) };
            handler(self, first, second);
        }
    }

    /// Set mob velocities from their tempo and let clouds drop fireballs
    fn step_mobs(&mut self, dt: f32) {
        let mobs: Vec<EntityId> = self
            .world
            .iter()
            .filter(|(_, thing)| matches!(thing.kind, EntityKind::Mob(_)))
            .map(|(id, _)| id)
            .collect();

        let mut drops = Vec::new();
        for id in mobs {
            let Some(Thing {
                kind: EntityKind::Mob(mob),
                body,
            }) = self.world.get_mut(id)
            else {
                continue;
            };
            match mob.kind {
                MobKind::Cloud => {
                    mob.sway += dt;
                    body.vel = Vec2::new(mob.tempo * mob.sway.cos(), 0.0);
                    mob.fire_timer -= dt;
                    if mob.fire_timer <= 0.0 {
                        let jitter: f32 = self.rng.random_range(-0.5..=0.5);
                        mob.fire_timer = CLOUD_FIRE_INTERVAL + jitter;
                        drops.push(Vec2::new(body.pos.x, body.max().y));
                    }
                }
                MobKind::Fireball => {}
                MobKind::Generic | MobKind::Mushroom | MobKind::Koopa => {
                    body.vel.x = mob.tempo;
                }
            }
        }

        for bottom in drops {
            let fireball = Mob::fireball();
            // Leave a gap wider than the contact slop so it clears the cloud
            let pos = bottom + Vec2::new(0.0, fireball.size.y / 2.0 + 2.0 * CONTACT_SLOP + 1.0);
            let body = Body::dynamic(pos, fireball.size, fireball.weight);
            self.world.add(EntityKind::Mob(fireball), body);
        }
    }

    /// Apply every timed effect that has run out
    pub fn run_timers(&mut self) {
        let now = self.now();
        for effect in self.scheduler.poll(now) {
            match effect {
                Effect::InvincibilityExpiry => {
                    self.player.clear_invincible();
                    self.events.push(GameEvent::InvincibilityEnded);
                    self.events.push(GameEvent::StatusChanged);
                }
                Effect::BrickRestore { switch } => reactions::restore_bricks(self, switch),
                Effect::MobRemoval { mob } => {
                    if self.remove_entity(mob).is_none() {
                        log::warn!("delayed removal of {:?} found nothing to remove", mob);
                    }
                    // Grown lasts while any squish window is still open
                    let pending = self
                        .scheduler
                        .timers()
                        .iter()
                        .any(|t| matches!(t.effect, Effect::MobRemoval { .. }));
                    if !pending {
                        self.player.set_grown(false);
                    }
                }
            }
        }
    }
}
