//! Rendering hand-off
//!
//! The simulation never draws anything itself. Each frame it captures a
//! [`Snapshot`] of every live entity and hands it to a [`Renderer`]; the HUD
//! gets a [`PlayerStatus`] whenever health, score or invincibility change.
//! Image selection (squished sprites, facing direction, bigger player) is the
//! renderer's business and is driven purely by the snapshot fields.

use std::io::Write;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::entity::{Category, EntityId, EntityKind, Player};
use crate::sim::state::GameState;

/// One entity as the renderer sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: EntityId,
    pub name: String,
    pub category: Category,
    pub kind: EntityKind,
    /// Centre position in world units
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub level: String,
    pub tick: u64,
    /// Horizontal scroll offset (added to world x)
    pub offset: f32,
    /// Live entities in id order
    pub entries: Vec<SnapshotEntry>,
    pub status: PlayerStatus,
}

impl Snapshot {
    pub fn capture(state: &GameState, offset: f32) -> Self {
        let entries = state
            .world
            .iter()
            .map(|(id, thing)| SnapshotEntry {
                id,
                name: thing.kind.name().to_string(),
                category: thing.category(),
                kind: thing.kind.clone(),
                pos: thing.body.pos,
                size: thing.body.size(),
                vel: thing.body.vel,
            })
            .collect();

        Self {
            level: state.level().to_string(),
            tick: state.time_ticks,
            offset,
            entries,
            status: PlayerStatus::from_player(&state.player),
        }
    }
}

/// Colour band of the health bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthBand {
    /// Star power active (yellow)
    Invincible,
    /// At least half health (green)
    Healthy,
    /// At least a quarter (orange)
    Hurt,
    /// Below a quarter (red)
    Critical,
}

impl HealthBand {
    pub fn colour(&self) -> &'static str {
        match self {
            HealthBand::Invincible => "yellow",
            HealthBand::Healthy => "green",
            HealthBand::Hurt => "orange",
            HealthBand::Critical => "red",
        }
    }
}

/// Status bar contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub character: String,
    pub health: u32,
    pub max_health: u32,
    pub score: u64,
    pub invincible: bool,
    pub bigger: bool,
}

impl PlayerStatus {
    pub fn from_player(player: &Player) -> Self {
        Self {
            character: player.name().to_string(),
            health: player.health(),
            max_health: player.max_health(),
            score: player.score(),
            invincible: player.is_invincible(),
            bigger: player.is_bigger(),
        }
    }

    /// Health as a fraction of the maximum
    pub fn health_fraction(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }

    pub fn band(&self) -> HealthBand {
        let fraction = self.health_fraction();
        if self.invincible {
            HealthBand::Invincible
        } else if fraction >= 0.5 {
            HealthBand::Healthy
        } else if fraction >= 0.25 {
            HealthBand::Hurt
        } else {
            HealthBand::Critical
        }
    }
}

/// Something that draws frames
pub trait Renderer {
    fn draw(&mut self, snapshot: &Snapshot);

    /// Health/score display changed
    fn refresh_status(&mut self, _status: &PlayerStatus) {}
}

/// Draws nothing
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw(&mut self, _snapshot: &Snapshot) {}
}

/// Writes every frame as one JSON line (headless runs, replays)
pub struct TraceRenderer<W: Write> {
    out: W,
    /// Only every n-th frame is written
    every: u64,
    frames: u64,
}

impl<W: Write> TraceRenderer<W> {
    pub fn new(out: W, every: u64) -> Self {
        Self {
            out,
            every: every.max(1),
            frames: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TraceRenderer<W> {
    fn draw(&mut self, snapshot: &Snapshot) {
        self.frames += 1;
        if (self.frames - 1) % self.every != 0 {
            return;
        }
        let written = serde_json::to_writer(&mut self.out, snapshot)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out));
        if let Err(e) = written {
            log::warn!("dropping trace frame {}: {}", snapshot.tick, e);
        }
    }

    fn refresh_status(&mut self, status: &PlayerStatus) {
        log::debug!(
            "status: health {}/{} ({}), score {}",
            status.health,
            status.max_health,
            status.band().colour(),
            status.score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(health: u32, invincible: bool) -> PlayerStatus {
        PlayerStatus {
            character: "mario".into(),
            health,
            max_health: 20,
            score: 0,
            invincible,
            bigger: false,
        }
    }

    #[test]
    fn test_health_bands() {
        assert_eq!(status(20, false).band(), HealthBand::Healthy);
        assert_eq!(status(10, false).band(), HealthBand::Healthy);
        assert_eq!(status(9, false).band(), HealthBand::Hurt);
        assert_eq!(status(5, false).band(), HealthBand::Hurt);
        assert_eq!(status(4, false).band(), HealthBand::Critical);
        assert_eq!(status(1, true).band(), HealthBand::Invincible);
    }

    #[test]
    fn test_trace_writes_json_lines() {
        let snapshot = Snapshot {
            level: "level1.txt".into(),
            tick: 3,
            offset: -12.0,
            entries: vec![SnapshotEntry {
                id: EntityId(1),
                name: "brick".into(),
                category: Category::Block,
                kind: EntityKind::Block(crate::sim::entity::Block::brick()),
                pos: Vec2::new(8.0, 8.0),
                size: Vec2::splat(16.0),
                vel: Vec2::ZERO,
            }],
            status: status(20, false),
        };

        let mut trace = TraceRenderer::new(Vec::new(), 2);
        trace.draw(&snapshot);
        trace.draw(&snapshot);
        trace.draw(&snapshot);
        let out = String::from_utf8(trace.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Snapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
