//! Per-entity reactions to the player
//!
//! Blocks, mobs and items each react to being touched by the player in their
//! own way. These run from the collision handlers and mutate the game state
//! directly; removal is immediate so later contacts in the same step see it.

use glam::Vec2;
use rand::Rng;

use super::collision::Direction;
use super::entity::{Block, EntityId, EntityKind, Item, ItemKind, MobKind};
use super::state::{GameEvent, GameState};
use super::timers::Effect;
use super::world::Body;
use crate::consts::*;

/// The player touched a block from `dir`
pub(crate) fn block_hit(state: &mut GameState, block: EntityId, dir: Direction) {
    let Some(kind) = state.block(block).cloned() else {
        return;
    };
    match kind {
        Block::Plain(_) | Block::Tunnel => {}
        Block::Mystery(_) => open_mystery(state, block, dir),
        Block::Bounce { .. } => {
            if dir == Direction::Above {
                if let Some(Block::Bounce { animating }) = state.block_mut(block) {
                    *animating = true;
                }
                let vel = state.player_velocity();
                state.set_player_velocity(Vec2::new(vel.x, -BOUNCE_SPEED));
            }
        }
        Block::Goal => {
            if dir == Direction::Above {
                state.player.restore_health();
                state.push_event(GameEvent::StatusChanged);
            } else {
                state.flag_goal_reached();
            }
        }
        Block::Switch(_) => press_switch(state, block, dir),
    }
}

/// The player stopped touching a block
pub(crate) fn block_released(state: &mut GameState, block: EntityId) {
    if let Some(Block::Bounce { animating }) = state.block_mut(block) {
        *animating = false;
    }
}

fn open_mystery(state: &mut GameState, block: EntityId, dir: Direction) {
    if dir != Direction::Below {
        return;
    }
    let (drop, (lo, hi), center) = match state.world.get(block) {
        Some(thing) => match &thing.kind {
            EntityKind::Block(Block::Mystery(mystery)) if mystery.is_active() => {
                (mystery.drop, mystery.drop_range, thing.body.pos)
            }
            _ => return,
        },
        None => return,
    };

    let item = match drop {
        None => None,
        Some(_) if lo > hi => {
            log::warn!("mystery block {:?} has an empty drop range {}..={}", block, lo, hi);
            return;
        }
        Some(ItemKind::Coin) => Some(Item::coin(state.rng.random_range(lo..=hi))),
        Some(ItemKind::Star) => Some(Item::star()),
    };

    if let Some(Block::Mystery(mystery)) = state.block_mut(block) {
        mystery.deactivate();
    }

    if let Some(item) = item {
        let kind = item.kind;
        let body = Body::fixed(center - Vec2::new(0.0, BLOCK_SIZE), item.size());
        state.world.add(EntityKind::Item(item), body);
        state.push_event(GameEvent::ItemDropped(kind));
    }
}

fn press_switch(state: &mut GameState, switch: EntityId, dir: Direction) {
    if dir != Direction::Above {
        return;
    }
    let center = match state.world.get(switch) {
        Some(thing) => match &thing.kind {
            EntityKind::Block(Block::Switch(s)) if !s.is_armed() => thing.body.pos,
            _ => return,
        },
        None => return,
    };

    let bricks: Vec<(EntityId, Vec2)> = state
        .world
        .things_in_range(center, SWITCH_RADIUS)
        .into_iter()
        .filter_map(|id| {
            let thing = state.world.get(id)?;
            match &thing.kind {
                EntityKind::Block(block) if block.is_brick() => Some((id, thing.body.pos)),
                _ => None,
            }
        })
        .collect();

    for (id, _) in &bricks {
        state.remove_entity(*id);
    }

    let now = state.now();
    let count = bricks.len();
    if let Some(Block::Switch(s)) = state.block_mut(switch) {
        s.arm(now, bricks.into_iter().map(|(_, pos)| pos).collect());
    }
    state
        .scheduler
        .schedule(Effect::BrickRestore { switch }, now, SWITCH_RESTORE_SECS);
    log::debug!("switch {:?} hid {} bricks", switch, count);
    state.push_event(GameEvent::BricksVanished(count));
}

/// Put back the bricks an armed switch removed
pub(crate) fn restore_bricks(state: &mut GameState, switch: EntityId) {
    let positions = match state.block_mut(switch) {
        Some(Block::Switch(s)) => s.disarm(),
        _ => {
            log::warn!("brick restore for {:?} but no such switch", switch);
            return;
        }
    };
    let count = positions.len();
    for pos in positions {
        state.world.add(
            EntityKind::Block(Block::brick()),
            Body::fixed(pos, Vec2::splat(BLOCK_SIZE)),
        );
    }
    log::debug!("switch {:?} restored {} bricks", switch, count);
    state.push_event(GameEvent::BricksRestored(count));
}

/// The player touched a live mob from `dir`
pub(crate) fn mob_hit(state: &mut GameState, mob: EntityId, dir: Direction) {
    let Some(kind) = state.mob(mob).map(|m| m.kind) else {
        return;
    };
    match kind {
        MobKind::Mushroom if dir == Direction::Above => {
            if let Some(m) = state.mob_mut(mob) {
                m.squish();
            }
            state.player.set_grown(true);
            let now = state.now();
            state
                .scheduler
                .schedule(Effect::MobRemoval { mob }, now, SQUISH_WINDOW_SECS);
            stomp_bounce(state);
            state.push_event(GameEvent::MobDefeated(kind));
        }
        MobKind::Mushroom => {
            state.player.change_health(-1);
            if let Some(m) = state.mob_mut(mob) {
                m.reverse();
            }
            shove_player(state, mob, dir, MUSHROOM_SHOVE);
        }
        MobKind::Koopa if dir == Direction::Above => {
            if let Some(m) = state.mob_mut(mob) {
                m.squish();
            }
            state.remove_entity(mob);
            stomp_bounce(state);
            state.player.set_bigger(true);
            state.push_event(GameEvent::MobDefeated(kind));
        }
        MobKind::Koopa => {
            state.player.change_health(-2);
            if let Some(m) = state.mob_mut(mob) {
                m.reverse();
            }
            shove_player(state, mob, dir, KOOPA_SHOVE);
        }
        MobKind::Fireball => {
            state.player.change_health(-1);
            state.remove_entity(mob);
        }
        MobKind::Generic | MobKind::Cloud => {}
    }
}

fn stomp_bounce(state: &mut GameState) {
    let vel = state.player_velocity();
    state.set_player_velocity(Vec2::new(vel.x, -STOMP_SPEED));
}

/// Push the player horizontally away from a mob
fn shove_player(state: &mut GameState, mob: EntityId, dir: Direction, speed: f32) {
    let away = match dir {
        Direction::Left => -1.0,
        Direction::Right => 1.0,
        Direction::Above | Direction::Below => {
            let player_x = state.player_body().map(|b| b.pos.x).unwrap_or_default();
            let mob_x = state.world.body(mob).map(|b| b.pos.x).unwrap_or_default();
            if player_x < mob_x { -1.0 } else { 1.0 }
        }
    };
    let vel = state.player_velocity();
    state.set_player_velocity(Vec2::new(away * speed, vel.y));
}

/// The player touched an item; it is consumed at most once
pub(crate) fn collect_item(state: &mut GameState, item: EntityId) {
    let Some(EntityKind::Item(picked)) = state.world.get(item).map(|t| t.kind.clone()) else {
        return;
    };
    state.remove_entity(item);
    match picked.kind {
        ItemKind::Coin => state.player.change_score(u64::from(picked.value)),
        ItemKind::Star => state.activate_invincibility(),
    }
    log::debug!("collected {}", picked.kind.as_str());
    state.push_event(GameEvent::ItemCollected(picked.kind));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Material, MysteryBlock, Player};
    use crate::sim::timers::ManualClock;
    use crate::sim::world::World;
    use std::time::Duration;

    fn state_with(clock: &ManualClock) -> GameState {
        GameState::new(
            "level1.txt",
            World::new(300.0, Vec2::new(640.0, 320.0)),
            Player::new("mario", 20, 100.0),
            Vec2::new(100.0, 116.0),
            100.0,
            Box::new(clock.clone()),
            3,
        )
    }

    fn add_block(state: &mut GameState, block: Block, pos: Vec2) -> EntityId {
        state
            .world
            .add(EntityKind::Block(block), Body::fixed(pos, Vec2::splat(BLOCK_SIZE)))
    }

    fn items(state: &GameState) -> Vec<(Item, Vec2)> {
        state
            .world
            .iter()
            .filter_map(|(_, t)| match &t.kind {
                EntityKind::Item(item) => Some((item.clone(), t.body.pos)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_mystery_coin_drops_once_above_block() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let block = add_block(
            &mut state,
            Block::Mystery(MysteryBlock::with_drop(ItemKind::Coin, (3, 6))),
            Vec2::new(100.0, 100.0),
        );

        block_hit(&mut state, block, Direction::Above);
        assert!(items(&state).is_empty());

        block_hit(&mut state, block, Direction::Below);
        block_hit(&mut state, block, Direction::Below);
        let dropped = items(&state);
        assert_eq!(dropped.len(), 1);
        let (coin, pos) = &dropped[0];
        assert_eq!(coin.kind, ItemKind::Coin);
        assert!((3..=6).contains(&coin.value));
        assert_eq!(*pos, Vec2::new(100.0, 84.0));
    }

    #[test]
    fn test_mystery_bad_range_is_ignored() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let block = add_block(
            &mut state,
            Block::Mystery(MysteryBlock::with_drop(ItemKind::Coin, (6, 3))),
            Vec2::new(100.0, 100.0),
        );
        block_hit(&mut state, block, Direction::Below);
        assert!(items(&state).is_empty());
        assert!(matches!(state.block(block), Some(Block::Mystery(m)) if m.is_active()));
    }

    #[test]
    fn test_switch_hides_and_restores_bricks() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let switch = add_block(
            &mut state,
            Block::Switch(Default::default()),
            Vec2::new(200.0, 200.0),
        );
        let near = add_block(&mut state, Block::brick(), Vec2::new(248.0, 200.0));
        let far = add_block(&mut state, Block::brick(), Vec2::new(400.0, 200.0));
        let cube = add_block(&mut state, Block::Plain(Material::Cube), Vec2::new(216.0, 200.0));

        block_hit(&mut state, switch, Direction::Above);
        assert!(!state.world.contains(near));
        assert!(state.world.contains(far));
        assert!(state.world.contains(cube));

        // Pressing again while armed does nothing
        block_hit(&mut state, switch, Direction::Above);
        assert_eq!(state.scheduler.len(), 1);

        clock.set(Duration::from_millis(10_001));
        state.run_timers();
        let restored = state
            .world
            .iter()
            .filter(|(_, t)| {
                t.kind == EntityKind::Block(Block::brick()) && t.body.pos == Vec2::new(248.0, 200.0)
            })
            .count();
        assert_eq!(restored, 1);
        assert!(matches!(state.block(switch), Some(Block::Switch(s)) if !s.is_armed()));
    }

    #[test]
    fn test_bounce_block_animates_while_touched() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let bounce = add_block(&mut state, Block::bounce(), Vec2::new(100.0, 132.0));

        block_hit(&mut state, bounce, Direction::Above);
        assert_eq!(state.player_velocity().y, -BOUNCE_SPEED);
        assert_eq!(state.block(bounce), Some(&Block::Bounce { animating: true }));

        block_released(&mut state, bounce);
        assert_eq!(state.block(bounce), Some(&Block::Bounce { animating: false }));
    }

    #[test]
    fn test_goal_top_heals_side_finishes() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let goal = add_block(&mut state, Block::Goal, Vec2::new(300.0, 100.0));
        state.player.change_health(-7);

        block_hit(&mut state, goal, Direction::Above);
        assert_eq!(state.player.health(), 20);
        assert!(!state.take_goal_reached());

        block_hit(&mut state, goal, Direction::Left);
        assert!(state.take_goal_reached());
        assert!(!state.take_goal_reached());
    }

    #[test]
    fn test_shove_from_above_uses_position() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let mob = state.world.add(
            EntityKind::Mob(crate::sim::entity::Mob::koopa()),
            Body::dynamic(Vec2::new(110.0, 132.0), Vec2::splat(16.0), 150.0),
        );
        shove_player(&mut state, mob, Direction::Below, KOOPA_SHOVE);
        assert_eq!(state.player_velocity().x, -KOOPA_SHOVE);
    }

    #[test]
    fn test_coin_adds_value_to_score() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock);
        let coin = state.world.add(
            EntityKind::Item(Item::coin(4)),
            Body::fixed(Vec2::new(100.0, 100.0), Vec2::splat(16.0)),
        );
        collect_item(&mut state, coin);
        collect_item(&mut state, coin);
        assert_eq!(state.player.score(), 4);
        assert_eq!(
            state
                .events()
                .iter()
                .filter(|e| **e == GameEvent::ItemCollected(ItemKind::Coin))
                .count(),
            1
        );
    }
}
