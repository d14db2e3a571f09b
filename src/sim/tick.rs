//! Fixed timestep simulation tick
//!
//! Applies one tick of player input, steps the world (which runs every
//! collision handler) and then polls the timers. Level transitions are
//! reported back to the caller instead of being performed here.

use glam::Vec2;

use super::entity::{Block, EntityId, EntityKind};
use super::state::GameState;
use crate::consts::*;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Horizontal movement request: negative left, positive right
    pub move_dir: f32,
    /// Jump (only works while standing on a block)
    pub jump: bool,
    /// Duck (enters a tunnel the player is standing on)
    pub duck: bool,
}

/// What the driver has to act on after a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Player touched a goal from the side or below
    pub goal_reached: bool,
    /// Player ducked on a tunnel; the world was not stepped
    pub tunnel_entered: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) -> TickOutcome {
    state.time_ticks += 1;

    if input.move_dir != 0.0 {
        apply_movement(state, input.move_dir);
    }

    if input.jump && standing_on(state).is_some() {
        let vel = state.player_velocity();
        state.set_player_velocity(Vec2::new(vel.x, -JUMP_SPEED));
    }

    if input.duck {
        let on_tunnel = standing_on(state)
            .is_some_and(|block| matches!(state.block(block), Some(Block::Tunnel)));
        if on_tunnel {
            log::debug!("player ducked into a tunnel on {}", state.level());
            return TickOutcome {
                tunnel_entered: true,
                ..Default::default()
            };
        }
    }

    state.step_physics(dt);
    state.run_timers();

    TickOutcome {
        goal_reached: state.take_goal_reached(),
        tunnel_entered: false,
    }
}

/// Nudge horizontal velocity, keeping it within the player's speed cap
fn apply_movement(state: &mut GameState, dir: f32) {
    let max = state.player.max_velocity;
    let vel = state.player_velocity();
    let vx = (vel.x + dir.signum() * MOVE_STEP).clamp(-max, max);
    state.set_player_velocity(Vec2::new(vx, vel.y));
}

/// Solid block directly under the player's feet, if any
///
/// Armed switches are skipped since the player falls through them.
pub fn standing_on(state: &GameState) -> Option<EntityId> {
    let body = state.player_body()?;
    let feet = Vec2::new(body.pos.x, body.max().y + FEET_PROBE);
    state
        .world
        .iter()
        .find(|(_, thing)| match &thing.kind {
            EntityKind::Block(Block::Switch(switch)) if switch.is_armed() => false,
            EntityKind::Block(_) => thing.body.contains_point(feet),
            _ => false,
        })
        .map(|(id, _)| id)
}

/// Horizontal camera offset (added to world x to get screen x)
///
/// Pinned at the left edge near the start of the level, pinned at the right
/// edge near its end and keeps the player centred in between.
pub fn scroll_offset(player_x: f32, viewport_width: f32, world_width: f32) -> f32 {
    let half = viewport_width / 2.0;
    if world_width <= viewport_width || player_x <= half {
        0.0
    } else if player_x >= world_width - half {
        viewport_width - world_width
    } else {
        half - player_x
    }
}
