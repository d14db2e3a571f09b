//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - Time comes from an injected clock
//! - No rendering, file or prompt dependencies

pub mod collision;
pub mod dispatch;
pub mod entity;
mod reactions;
pub mod state;
pub mod tick;
pub mod timers;
pub mod world;

pub use collision::{Direction, classify};
pub use dispatch::HandlerTable;
pub use entity::{
    Block, Category, EntityId, EntityKind, Item, ItemKind, Material, Mob, MobKind, MysteryBlock,
    Player, SwitchBlock,
};
pub use state::{GameEvent, GameState, PLAYER_SIZE};
pub use tick::{TickInput, TickOutcome, scroll_offset, standing_on, tick};
pub use timers::{Clock, Effect, ManualClock, MonotonicClock, Scheduler};
pub use world::{Body, Motion, Thing, World};
