//! Collision dispatch
//!
//! Handlers are registered per ordered pair of categories. A contact between
//! categories (X, Y) finds the (X, Y) handler directly or the (Y, X) handler
//! with its arguments swapped, so every handler sees its entities in the
//! order it was registered with. The contact direction is classified in that
//! same order. Pairs without a handler are plain solids.

use std::collections::HashMap;

use super::collision::Direction;
use super::entity::{Block, Category, EntityId, MobKind};
use super::reactions;
use super::state::{GameEvent, GameState};

/// Called when a contact begins; returns whether the contact is solid
pub type BeginHandler = fn(&mut GameState, EntityId, EntityId, Direction) -> bool;
/// Called when a contact ends
pub type SeparateHandler = fn(&mut GameState, EntityId, EntityId);

#[derive(Clone, Default)]
pub struct HandlerTable {
    begin: HashMap<(Category, Category), BeginHandler>,
    separate: HashMap<(Category, Category), SeparateHandler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The game's standard rule set
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.on_begin(Category::Player, Category::Block, player_block);
        table.on_separate(Category::Player, Category::Block, player_block_separate);
        table.on_begin(Category::Player, Category::Mob, player_mob);
        table.on_begin(Category::Player, Category::Item, player_item);
        table.on_begin(Category::Mob, Category::Block, mob_block);
        table.on_begin(Category::Mob, Category::Mob, mob_mob);
        table.on_begin(Category::Mob, Category::Item, mob_item);
        table
    }

    pub fn on_begin(&mut self, first: Category, second: Category, handler: BeginHandler) {
        self.begin.insert((first, second), handler);
    }

    pub fn on_separate(&mut self, first: Category, second: Category, handler: SeparateHandler) {
        self.separate.insert((first, second), handler);
    }

    /// Begin handler for a pair and whether the arguments must be swapped
    pub fn begin_for(&self, a: Category, b: Category) -> Option<(BeginHandler, bool)> {
        if let Some(handler) = self.begin.get(&(a, b)) {
            return Some((*handler, false));
        }
        self.begin.get(&(b, a)).map(|handler| (*handler, true))
    }

    /// Separate handler for a pair and whether the arguments must be swapped
    pub fn separate_for(&self, a: Category, b: Category) -> Option<(SeparateHandler, bool)> {
        if let Some(handler) = self.separate.get(&(a, b)) {
            return Some((*handler, false));
        }
        self.separate.get(&(b, a)).map(|handler| (*handler, true))
    }
}

fn is_armed_switch(state: &GameState, block: EntityId) -> bool {
    matches!(state.block(block), Some(Block::Switch(switch)) if switch.is_armed())
}

fn player_block(state: &mut GameState, _player: EntityId, block: EntityId, dir: Direction) -> bool {
    // An armed switch no longer holds the player up
    let was_armed = is_armed_switch(state, block);
    reactions::block_hit(state, block, dir);
    !was_armed
}

fn player_block_separate(state: &mut GameState, _player: EntityId, block: EntityId) {
    reactions::block_released(state, block);
}

fn player_mob(state: &mut GameState, _player: EntityId, mob: EntityId, dir: Direction) -> bool {
    let Some(mob_state) = state.mob(mob) else {
        return false;
    };
    // Squished mobs are scenery until they are cleared away
    if mob_state.is_squished() {
        return false;
    }
    let kind = mob_state.kind;

    let solid = if state.player.is_invincible() {
        state.remove_entity(mob);
        state.push_event(GameEvent::MobDefeated(kind));
        false
    } else {
        reactions::mob_hit(state, mob, dir);
        true
    };
    state.push_event(GameEvent::StatusChanged);
    solid
}

fn player_item(state: &mut GameState, _player: EntityId, item: EntityId, _dir: Direction) -> bool {
    reactions::collect_item(state, item);
    state.push_event(GameEvent::StatusChanged);
    false
}

fn mob_block(state: &mut GameState, mob: EntityId, block: EntityId, dir: Direction) -> bool {
    let Some(kind) = state.mob(mob).map(|m| m.kind) else {
        return true;
    };
    match kind {
        MobKind::Fireball => {
            if state.block(block).is_some_and(Block::is_brick) {
                state.remove_entity(block);
            }
            state.remove_entity(mob);
        }
        MobKind::Mushroom | MobKind::Koopa if dir.is_side() => {
            if let Some(mob) = state.mob_mut(mob) {
                mob.reverse();
            }
        }
        _ => {}
    }
    true
}

fn mob_mob(state: &mut GameState, a: EntityId, b: EntityId, _dir: Direction) -> bool {
    let (Some(first), Some(second)) = (state.mob(a), state.mob(b)) else {
        return false;
    };
    let kinds = [first.kind, second.kind];
    let tempo = first.tempo;
    let squished = first.is_squished() || second.is_squished();

    if kinds.contains(&MobKind::Fireball) {
        state.remove_entity(a);
        state.remove_entity(b);
        return false;
    }
    // Corpses neither push nor get pushed
    if squished {
        return false;
    }
    if kinds.contains(&MobKind::Mushroom) {
        if let Some(first) = state.mob_mut(a) {
            first.tempo = -tempo;
        }
        if let Some(second) = state.mob_mut(b) {
            second.tempo = tempo;
        }
    }
    false
}

fn mob_item(_state: &mut GameState, _mob: EntityId, _item: EntityId, _dir: Direction) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::entity::{EntityKind, Item, Mob, MysteryBlock, Player};
    use crate::sim::timers::ManualClock;
    use crate::sim::world::{Body, World};
    use glam::Vec2;

    fn state_with(clock: &ManualClock, player_at: Vec2) -> GameState {
        let world = World::new(300.0, Vec2::new(640.0, 320.0));
        GameState::new(
            "level1.txt",
            world,
            Player::new("mario", 20, 100.0),
            player_at,
            100.0,
            Box::new(clock.clone()),
            42,
        )
    }

    fn add_block(state: &mut GameState, block: Block, pos: Vec2) -> EntityId {
        state
            .world
            .add(EntityKind::Block(block), Body::fixed(pos, Vec2::splat(BLOCK_SIZE)))
    }

    fn add_mob(state: &mut GameState, mob: Mob, pos: Vec2) -> EntityId {
        let body = Body::dynamic(pos, mob.size, mob.weight);
        state.world.add(EntityKind::Mob(mob), body)
    }

    #[test]
    fn test_lookup_swaps_reverse_order() {
        let table = HandlerTable::standard();
        let (_, swapped) = table.begin_for(Category::Player, Category::Mob).unwrap();
        assert!(!swapped);
        let (_, swapped) = table.begin_for(Category::Block, Category::Player).unwrap();
        assert!(swapped);
        assert!(table.begin_for(Category::Player, Category::Boundary).is_none());
        assert!(table.separate_for(Category::Block, Category::Player).is_some());
    }

    #[test]
    fn test_unhandled_pair_is_solid() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(100.0, 100.0));
        let wall = state.world.add(
            EntityKind::Boundary,
            Body::fixed(Vec2::new(100.0, 116.0), Vec2::splat(16.0)),
        );
        state.step_physics(SIM_DT);
        assert_eq!(state.world.contact_solid(state.player_id(), wall), Some(true));
    }

    #[test]
    fn test_mushroom_stomp_squishes_and_bounces() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(100.0, 100.0));
        let player = state.player_id();
        let mob = add_mob(&mut state, Mob::mushroom(), Vec2::new(100.0, 116.0));
        state.set_player_velocity(Vec2::new(0.0, 50.0));

        assert!(player_mob(&mut state, player, mob, Direction::Above));
        assert!(state.mob(mob).unwrap().is_squished());
        assert_eq!(state.mob(mob).unwrap().tempo, 0.0);
        assert_eq!(state.player_velocity().y, -STOMP_SPEED);
        assert!(state.player.is_grown());
        assert_eq!(state.player.health(), 20);

        // Cleared after the squish window, not before
        clock.set(std::time::Duration::from_millis(1_500));
        state.run_timers();
        assert!(state.world.contains(mob));
        clock.set(std::time::Duration::from_millis(2_100));
        state.run_timers();
        assert!(!state.world.contains(mob));
        assert!(!state.player.is_grown());
    }

    #[test]
    fn test_mushroom_side_hit_hurts_and_shoves() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(84.0, 100.0));
        let player = state.player_id();
        let mob = add_mob(&mut state, Mob::mushroom(), Vec2::new(100.0, 100.0));

        assert!(player_mob(&mut state, player, mob, Direction::Left));
        assert_eq!(state.player.health(), 19);
        assert_eq!(state.mob(mob).unwrap().tempo, 40.0);
        assert_eq!(state.player_velocity().x, -MUSHROOM_SHOVE);
    }

    #[test]
    fn test_koopa_stomp_and_side_hit() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(120.0, 100.0));
        let player = state.player_id();
        let side = add_mob(&mut state, Mob::koopa(), Vec2::new(104.0, 100.0));
        assert!(player_mob(&mut state, player, side, Direction::Right));
        assert_eq!(state.player.health(), 18);
        assert_eq!(state.mob(side).unwrap().tempo, 110.0);
        assert_eq!(state.player_velocity().x, KOOPA_SHOVE);

        let stomped = add_mob(&mut state, Mob::koopa(), Vec2::new(120.0, 116.0));
        player_mob(&mut state, player, stomped, Direction::Above);
        assert!(!state.world.contains(stomped));
        assert!(state.player.is_bigger());
        assert_eq!(state.player_velocity().y, -STOMP_SPEED);
    }

    #[test]
    fn test_invincible_player_removes_mob() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(84.0, 100.0));
        let player = state.player_id();
        let mob = add_mob(&mut state, Mob::koopa(), Vec2::new(100.0, 100.0));
        state.activate_invincibility();

        assert!(!player_mob(&mut state, player, mob, Direction::Left));
        assert!(!state.world.contains(mob));
        assert_eq!(state.player.health(), 20);
        assert!(state.events().contains(&GameEvent::StatusChanged));
    }

    #[test]
    fn test_star_grants_invincibility() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(84.0, 100.0));
        let player = state.player_id();
        let star = state.world.add(
            EntityKind::Item(Item::star()),
            Body::fixed(Vec2::new(96.0, 100.0), Vec2::splat(16.0)),
        );

        assert!(!player_item(&mut state, player, star, Direction::Left));
        assert!(state.player.is_invincible());
        assert!(!state.world.contains(star));
        // A second contact in the same step finds nothing to collect
        player_item(&mut state, player, star, Direction::Left);
        assert_eq!(state.scheduler.len(), 1);
    }

    #[test]
    fn test_fireball_breaks_brick() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(20.0, 20.0));
        let brick = add_block(&mut state, Block::brick(), Vec2::new(200.0, 200.0));
        let cube = add_block(
            &mut state,
            Block::Plain(crate::sim::entity::Material::Cube),
            Vec2::new(300.0, 200.0),
        );
        let first = add_mob(&mut state, Mob::fireball(), Vec2::new(200.0, 188.0));
        let second = add_mob(&mut state, Mob::fireball(), Vec2::new(300.0, 188.0));

        mob_block(&mut state, first, brick, Direction::Above);
        mob_block(&mut state, second, cube, Direction::Above);
        assert!(!state.world.contains(brick));
        assert!(state.world.contains(cube));
        assert!(!state.world.contains(first));
        assert!(!state.world.contains(second));
    }

    #[test]
    fn test_walker_turns_at_walls_only() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(20.0, 20.0));
        let block = add_block(&mut state, Block::brick(), Vec2::new(200.0, 200.0));
        let mob = add_mob(&mut state, Mob::mushroom(), Vec2::new(184.0, 200.0));

        assert!(mob_block(&mut state, mob, block, Direction::Above));
        assert_eq!(state.mob(mob).unwrap().tempo, -40.0);
        assert!(mob_block(&mut state, mob, block, Direction::Left));
        assert_eq!(state.mob(mob).unwrap().tempo, 40.0);
    }

    #[test]
    fn test_mushroom_tempo_exchange() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(20.0, 20.0));
        let a = add_mob(&mut state, Mob::mushroom(), Vec2::new(200.0, 200.0));
        let b = add_mob(&mut state, Mob::koopa(), Vec2::new(216.0, 200.0));

        assert!(!mob_mob(&mut state, a, b, Direction::Left));
        assert_eq!(state.mob(a).unwrap().tempo, 40.0);
        assert_eq!(state.mob(b).unwrap().tempo, -40.0);
    }

    #[test]
    fn test_squished_mushroom_leaves_walkers_alone() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(20.0, 20.0));
        let corpse = add_mob(&mut state, Mob::mushroom(), Vec2::new(200.0, 200.0));
        let koopa = add_mob(&mut state, Mob::koopa(), Vec2::new(216.0, 200.0));
        state.mob_mut(corpse).unwrap().squish();

        assert!(!mob_mob(&mut state, corpse, koopa, Direction::Left));
        assert_eq!(state.mob(koopa).unwrap().tempo, -110.0);
        assert_eq!(state.mob(corpse).unwrap().tempo, 0.0);

        assert!(!mob_mob(&mut state, koopa, corpse, Direction::Right));
        assert_eq!(state.mob(koopa).unwrap().tempo, -110.0);
        assert_eq!(state.mob(corpse).unwrap().tempo, 0.0);
    }

    #[test]
    fn test_fireball_takes_out_other_mob() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(20.0, 20.0));
        let a = add_mob(&mut state, Mob::fireball(), Vec2::new(200.0, 200.0));
        let b = add_mob(&mut state, Mob::koopa(), Vec2::new(210.0, 200.0));
        assert!(!mob_mob(&mut state, a, b, Direction::Left));
        assert!(!state.world.contains(a));
        assert!(!state.world.contains(b));
    }

    #[test]
    fn test_armed_switch_stops_being_solid() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(100.0, 84.0));
        let player = state.player_id();
        let switch = add_block(
            &mut state,
            Block::Switch(Default::default()),
            Vec2::new(100.0, 100.0),
        );

        assert!(player_block(&mut state, player, switch, Direction::Above));
        assert!(is_armed_switch(&state, switch));
        assert!(!player_block(&mut state, player, switch, Direction::Above));
    }

    #[test]
    fn test_empty_mystery_block_deactivates() {
        let clock = ManualClock::new();
        let mut state = state_with(&clock, Vec2::new(100.0, 116.0));
        let player = state.player_id();
        let block = add_block(
            &mut state,
            Block::Mystery(MysteryBlock::empty()),
            Vec2::new(100.0, 100.0),
        );
        let before = state.world.len();

        assert!(player_block(&mut state, player, block, Direction::Below));
        assert_eq!(state.world.len(), before);
        assert!(matches!(state.block(block), Some(Block::Mystery(m)) if !m.is_active()));
    }
}
