//! Mushroom Run - a side-scrolling platformer
//!
//! Core modules:
//! - `sim`: Tick-driven simulation (rigid-body world, contacts, reactions, timers)
//! - `game`: Level flow around the simulation (death, goal, tunnels, prompts)
//! - `level`: Level text parsing and world building
//! - `config`: `==Section==` configuration file
//! - `highscores`: Per-level score tables
//! - `renderer`: Snapshot hand-off to whatever draws the game

pub mod config;
pub mod game;
pub mod highscores;
pub mod level;
pub mod renderer;
pub mod sim;

pub use config::GameConfig;
pub use game::{Game, GamePhase, Prompter};
pub use highscores::{HighScores, ScoreBook};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (one step every 10 ms)
    pub const SIM_DT: f32 = 1.0 / 100.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Side of a level grid cell in world units
    pub const BLOCK_SIZE: f32 = 16.0;
    /// Widest viewport the camera scrolls within
    pub const MAX_VIEWPORT_WIDTH: f32 = 1080.0;

    /// Boxes closer than this still count as touching
    pub const CONTACT_SLOP: f32 = 0.5;
    /// Vertical penetration below this always reads as a top/bottom contact
    pub const SHALLOW_CONTACT: f32 = 1.0;

    /// Upward speed of a jump (negative y is up)
    pub const JUMP_SPEED: f32 = 210.0;
    /// Upward speed from landing on a bounce block
    pub const BOUNCE_SPEED: f32 = 310.0;
    /// Upward speed after stomping a mob
    pub const STOMP_SPEED: f32 = 200.0;
    /// Horizontal shove when a mushroom hurts the player
    pub const MUSHROOM_SHOVE: f32 = 90.0;
    /// Horizontal shove when a koopa hurts the player
    pub const KOOPA_SHOVE: f32 = 110.0;
    /// Horizontal speed change per movement input
    pub const MOVE_STEP: f32 = 10.0;
    /// How far below the feet the jump/duck probe looks
    pub const FEET_PROBE: f32 = 1.0;

    /// Star invincibility duration (seconds)
    pub const INVINCIBILITY_SECS: f64 = 10.0;
    /// Time until a switch brings its bricks back (seconds)
    pub const SWITCH_RESTORE_SECS: f64 = 10.0;
    /// Squished mushroom death animation window (seconds)
    pub const SQUISH_WINDOW_SECS: f64 = 2.0;
    /// Bricks within this distance of a switch vanish when it is pressed
    pub const SWITCH_RADIUS: f32 = 80.0;

    /// Base delay between cloud fireball drops (seconds)
    pub const CLOUD_FIRE_INTERVAL: f32 = 3.0;
}
