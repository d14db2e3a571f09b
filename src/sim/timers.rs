//! Timed effects
//!
//! Wall-clock timers for invincibility expiry, switch brick restoration and
//! delayed mob removal. Nothing here is event driven: the scheduler is polled
//! once per tick and hands back whatever has expired. Time keeps running
//! during modal prompts; there is no pause.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::entity::EntityId;

/// Monotonic time source, measured from an arbitrary origin
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Real monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + Duration::from_secs_f64(secs));
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// What happens when a timer runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Player stops being invincible
    InvincibilityExpiry,
    /// Switch puts its vanished bricks back
    BrickRestore { switch: EntityId },
    /// Squished mob leaves the world
    MobRemoval { mob: EntityId },
}

impl Effect {
    /// Entity the effect acts on, if any
    pub fn target(&self) -> Option<EntityId> {
        match self {
            Effect::InvincibilityExpiry => None,
            Effect::BrickRestore { switch } => Some(*switch),
            Effect::MobRemoval { mob } => Some(*mob),
        }
    }
}

/// A pending effect
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub effect: Effect,
    pub started: Duration,
    pub duration: Duration,
}

impl Timer {
    /// Strictly more than `duration` has elapsed
    pub fn expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.started) > self.duration
    }
}

/// Pending timed effects in scheduling order
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the timer for an effect
    pub fn schedule(&mut self, effect: Effect, now: Duration, secs: f64) {
        self.timers.retain(|t| t.effect != effect);
        self.timers.push(Timer {
            effect,
            started: now,
            duration: Duration::from_secs_f64(secs),
        });
    }

    /// Drop every timer acting on an entity
    pub fn cancel_target(&mut self, id: EntityId) {
        self.timers.retain(|t| t.effect.target() != Some(id));
    }

    /// Drop every entity-bound timer (the world they refer to is gone)
    pub fn cancel_entity_timers(&mut self) {
        self.timers.retain(|t| t.effect.target().is_none());
    }

    pub fn is_scheduled(&self, effect: &Effect) -> bool {
        self.timers.iter().any(|t| t.effect == *effect)
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Remove and return every expired effect, oldest first
    pub fn poll(&mut self, now: Duration) -> Vec<Effect> {
        let (due, pending): (Vec<Timer>, Vec<Timer>) =
            self.timers.drain(..).partition(|t| t.expired(now));
        self.timers = pending;
        due.into_iter().map(|t| t.effect).collect()
    }
}
