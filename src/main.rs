//! Mushroom Run entry point
//!
//! Headless native runner: loads the config, plays the start level with a
//! simple autopilot and writes every frame to stdout as JSON lines.
//!
//! Usage: `mushroom-run [config.txt] [seconds]`

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use mushroom_run::consts::*;
use mushroom_run::game::{Game, GamePhase, Prompter};
use mushroom_run::level::LevelDir;
use mushroom_run::renderer::TraceRenderer;
use mushroom_run::sim::{MonotonicClock, TickInput};
use mushroom_run::{GameConfig, ScoreBook};

/// Answers prompts without a human: records under a fixed name, never restarts
struct HeadlessPrompter {
    name: String,
}

impl Prompter for HeadlessPrompter {
    fn ask_name(&mut self, level: &str, score: u64) -> Option<String> {
        log::info!("{} finished with {} points", level, score);
        Some(self.name.clone())
    }

    fn confirm_restart_after_death(&mut self) -> bool {
        false
    }

    fn confirm_restart_after_victory(&mut self) -> bool {
        false
    }

    fn ask_level_name(&mut self) -> Option<String> {
        None
    }
}

/// Fixed-step driver around the game
struct Runner {
    game: Game,
    input: TickInput,
    accumulator: f32,
    prompter: HeadlessPrompter,
    renderer: TraceRenderer<std::io::Stdout>,
}

impl Runner {
    /// Run simulation frames for `dt` seconds of real time
    fn update(&mut self, dt: f32) -> GamePhase {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.autopilot();
            let phase = self
                .game
                .frame(&self.input, SIM_DT, &mut self.prompter, &mut self.renderer);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot inputs
            self.input.jump = false;
            self.input.duck = false;

            if phase == GamePhase::Exited {
                return phase;
            }
        }
        self.game.phase()
    }

    /// Keep walking right, hop every so often
    fn autopilot(&mut self) {
        let ticks = self.game.state().time_ticks;
        self.input.move_dir = 1.0;
        self.input.jump = ticks % 120 == 0;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| "config.txt".to_string()));
    let seconds: f32 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid run length {:?}", raw))?,
        None => 10.0,
    };

    let config = GameConfig::load(&config_path)?;
    let data_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let name = config.player.character.clone();
    let game = Game::new(
        config,
        Box::new(LevelDir::new(&data_dir)),
        ScoreBook::new(&data_dir),
        Box::new(MonotonicClock::new()),
        0x5eed,
    )?;
    log::info!("Mushroom Run (headless) starting, {} s", seconds);

    let mut runner = Runner {
        game,
        input: TickInput::default(),
        accumulator: 0.0,
        prompter: HeadlessPrompter { name },
        renderer: TraceRenderer::new(std::io::stdout(), 10),
    };

    let started = Instant::now();
    let mut last = started;
    while started.elapsed().as_secs_f32() < seconds {
        std::thread::sleep(Duration::from_secs_f32(SIM_DT));
        let now = Instant::now();
        let dt = (now - last).as_secs_f32();
        last = now;
        if runner.update(dt) == GamePhase::Exited {
            break;
        }
    }

    let status = &runner.game.state().player;
    log::info!(
        "Finished on {} with score {} and health {}/{}",
        runner.game.level(),
        status.score(),
        status.health(),
        status.max_health()
    );
    Ok(())
}
