//! Level flow around the simulation
//!
//! [`Game`] owns the running [`GameState`] and drives it one frame at a
//! time: it ticks the simulation, reacts to the player dying, reaching a goal
//! or ducking into a tunnel, keeps the camera in range and hands a snapshot
//! to the renderer. Anything that needs a human decision goes through a
//! [`Prompter`]; the simulation clock keeps running while it waits.

use anyhow::Result;

use crate::config::{Destination, GameConfig};
use crate::consts::MAX_VIEWPORT_WIDTH;
use crate::highscores::{HighScores, ScoreBook};
use crate::level::{LevelSource, WorldBuilder};
use crate::renderer::{PlayerStatus, Renderer, Snapshot};
use crate::sim::entity::Player;
use crate::sim::state::{GameEvent, GameState};
use crate::sim::tick::{TickInput, scroll_offset, tick};
use crate::sim::timers::Clock;

/// Where the game loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Running,
    /// Health hit zero; waiting on the restart decision
    Dead,
    /// Goal reached; waiting on name entry
    LevelComplete,
    /// Last level finished; waiting on the restart decision
    Ended,
    /// Player chose to quit
    Exited,
}

/// Modal questions the game asks the player
pub trait Prompter {
    /// Name for the high score table (None = skip recording)
    fn ask_name(&mut self, level: &str, score: u64) -> Option<String>;
    fn confirm_restart_after_death(&mut self) -> bool;
    fn confirm_restart_after_victory(&mut self) -> bool;
    /// Level to load from the menu (None = cancelled)
    fn ask_level_name(&mut self) -> Option<String>;
}

pub struct Game {
    state: GameState,
    config: GameConfig,
    levels: Box<dyn LevelSource>,
    builder: WorldBuilder,
    scores: ScoreBook,
    phase: GamePhase,
    scroll: f32,
}

impl Game {
    /// Start a new game on the configured start level
    ///
    /// Fails when the start level cannot be read.
    pub fn new(
        config: GameConfig,
        levels: Box<dyn LevelSource>,
        scores: ScoreBook,
        clock: Box<dyn Clock>,
        seed: u64,
    ) -> Result<Self> {
        let builder = WorldBuilder::standard(config.gravity);
        let world = builder.load(levels.as_ref(), &config.start_level)?;
        let player = Player::new(
            config.player.character.clone(),
            config.player.health,
            config.player.max_velocity,
        );
        let state = GameState::new(
            config.start_level.clone(),
            world,
            player,
            config.player.spawn(),
            config.player.mass,
            clock,
            seed,
        );
        log::info!("Starting on {} as {}", config.start_level, config.player.character);

        Ok(Self {
            state,
            config,
            levels,
            builder,
            scores,
            phase: GamePhase::Running,
            scroll: 0.0,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn level(&self) -> &str {
        self.state.level()
    }

    /// Current horizontal scroll offset
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Viewport width used for scrolling (never wider than the level)
    pub fn viewport_width(&self) -> f32 {
        MAX_VIEWPORT_WIDTH.min(self.state.world.pixel_size().x)
    }

    /// Switch to another level, keeping the player's stats
    pub fn load_level(&mut self, name: &str) -> Result<()> {
        let world = self.builder.load(self.levels.as_ref(), name)?;
        self.state
            .install_world(name, world, self.config.player.spawn(), self.config.player.mass);
        self.scroll = 0.0;
        self.phase = GamePhase::Running;
        log::info!("Loaded level {}", name);
        Ok(())
    }

    /// Start the current level over with full health
    pub fn reset_level(&mut self) -> Result<()> {
        self.state.player.restore_health();
        let level = self.state.level().to_string();
        self.load_level(&level)
    }

    /// Menu "load level": ask for a name and load it, staying put on failure
    pub fn prompt_load_level(&mut self, prompter: &mut dyn Prompter) -> bool {
        let Some(name) = prompter.ask_level_name() else {
            return false;
        };
        match self.load_level(name.trim()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("could not load {}: {:#}", name, e);
                false
            }
        }
    }

    /// Top ten for the current level
    pub fn high_scores(&self) -> Result<HighScores> {
        self.scores.top_ten(self.state.level())
    }

    /// Run one frame: tick, level flow, camera and drawing
    pub fn frame(
        &mut self,
        input: &TickInput,
        dt: f32,
        prompter: &mut dyn Prompter,
        renderer: &mut dyn Renderer,
    ) -> GamePhase {
        if self.phase == GamePhase::Exited {
            return self.phase;
        }

        if self.state.player.is_dead() {
            self.phase = GamePhase::Dead;
            if prompter.confirm_restart_after_death() {
                self.restart_game();
            } else {
                self.exit();
            }
            return self.phase;
        }

        let outcome = tick(&mut self.state, input, dt);
        if outcome.tunnel_entered {
            self.enter_tunnel();
        }
        if outcome.goal_reached {
            self.finish_level(prompter);
        }
        if self.phase == GamePhase::Exited {
            return self.phase;
        }

        if let Some(body) = self.state.player_body() {
            self.scroll = scroll_offset(
                body.pos.x,
                self.viewport_width(),
                self.state.world.pixel_size().x,
            );
        }

        let events = self.state.drain_events();
        if events.contains(&GameEvent::StatusChanged) {
            renderer.refresh_status(&PlayerStatus::from_player(&self.state.player));
        }
        renderer.draw(&Snapshot::capture(&self.state, self.scroll));
        self.phase
    }

    fn exit(&mut self) {
        log::info!("Player left the game");
        self.phase = GamePhase::Exited;
    }

    /// Back to the start level with full health
    fn restart_game(&mut self) {
        self.state.player.restore_health();
        let start = self.config.start_level.clone();
        if let Err(e) = self.load_level(&start) {
            log::error!("could not restart on {}: {:#}", start, e);
            self.exit();
        }
    }

    fn finish_level(&mut self, prompter: &mut dyn Prompter) {
        self.phase = GamePhase::LevelComplete;
        let level = self.state.level().to_string();
        let score = self.state.player.score();

        if let Some(name) = prompter.ask_name(&level, score) {
            let name = name.trim();
            if !name.is_empty() {
                if let Err(e) = self.scores.record(&level, name, score) {
                    log::warn!("could not record score: {:#}", e);
                }
            }
        }

        match self.config.goal_destination(&level) {
            Destination::Level(next) => {
                if let Err(e) = self.load_level(&next) {
                    log::warn!("could not load {} after {}: {:#}", next, level, e);
                    self.phase = GamePhase::Running;
                }
            }
            Destination::End => {
                self.phase = GamePhase::Ended;
                if prompter.confirm_restart_after_victory() {
                    self.restart_game();
                } else {
                    self.exit();
                }
            }
        }
    }

    fn enter_tunnel(&mut self) {
        let level = self.state.level().to_string();
        let Some(dest) = self.config.tunnel_destination(&level).map(str::to_string) else {
            log::warn!("tunnel on {} leads nowhere", level);
            return;
        };
        if let Err(e) = self.load_level(&dest) {
            log::warn!("could not enter tunnel to {}: {:#}", dest, e);
        }
    }
}
