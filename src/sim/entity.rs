//! Entity model
//!
//! Everything that can live in a level world: the player body, blocks, mobs,
//! items and boundary walls. Variant-specific mutable state (mystery block
//! activity, switch arming, squished mobs) lives on the variant itself, so a
//! removed entity takes its state with it.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::BLOCK_SIZE;

/// Identity of a thing in a world (unique per loaded level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Collision category of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Player,
    Block,
    Mob,
    Item,
    Boundary,
}

/// Plain block materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Material {
    Brick,
    BrickBase,
    Cube,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Brick => "brick",
            Material::BrickBase => "brick_base",
            Material::Cube => "cube",
        }
    }
}

/// Collectible item types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Coin,
    Star,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Coin => "coin",
            ItemKind::Star => "star",
        }
    }
}

/// A collectible item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub kind: ItemKind,
    /// Score granted on collection (coins only)
    pub value: u32,
}

impl Item {
    pub fn coin(value: u32) -> Self {
        Self {
            kind: ItemKind::Coin,
            value,
        }
    }

    pub fn star() -> Self {
        Self {
            kind: ItemKind::Star,
            value: 0,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::splat(BLOCK_SIZE)
    }
}

/// A block that pops a single drop when struck from below
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MysteryBlock {
    /// Item type to drop (None = empty mystery block)
    pub drop: Option<ItemKind>,
    /// Inclusive range the drop's count is drawn from
    pub drop_range: (u32, u32),
    active: bool,
}

impl MysteryBlock {
    pub fn empty() -> Self {
        Self {
            drop: None,
            drop_range: (0, 0),
            active: true,
        }
    }

    pub fn with_drop(drop: ItemKind, drop_range: (u32, u32)) -> Self {
        Self {
            drop: Some(drop),
            drop_range,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }
}

/// A switch that hides nearby bricks for a while once stepped on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchBlock {
    armed: bool,
    activated_at: Option<Duration>,
    /// Brick centres removed by the current activation
    removed_bricks: Vec<Vec2>,
}

impl SwitchBlock {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn activated_at(&self) -> Option<Duration> {
        self.activated_at
    }

    pub fn removed_bricks(&self) -> &[Vec2] {
        &self.removed_bricks
    }

    pub(crate) fn arm(&mut self, now: Duration, removed: Vec<Vec2>) {
        self.armed = true;
        self.activated_at = Some(now);
        self.removed_bricks = removed;
    }

    /// Clear the armed state, handing back the positions to restore
    pub(crate) fn disarm(&mut self) -> Vec<Vec2> {
        self.armed = false;
        self.activated_at = None;
        std::mem::take(&mut self.removed_bricks)
    }
}

/// Block variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Plain(Material),
    Mystery(MysteryBlock),
    Bounce {
        /// True while the player is standing on it
        animating: bool,
    },
    Goal,
    Tunnel,
    Switch(SwitchBlock),
}

impl Block {
    pub fn brick() -> Self {
        Block::Plain(Material::Brick)
    }

    pub fn bounce() -> Self {
        Block::Bounce { animating: false }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Block::Plain(material) => material.as_str(),
            Block::Mystery(_) => "mystery",
            Block::Bounce { .. } => "bounce",
            Block::Goal => "goal",
            Block::Tunnel => "tunnel",
            Block::Switch(_) => "switch",
        }
    }

    /// Only bricks react to switches and fireballs
    pub fn is_brick(&self) -> bool {
        matches!(self, Block::Plain(Material::Brick))
    }
}

/// Mob variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobKind {
    Generic,
    Cloud,
    Fireball,
    Mushroom,
    Koopa,
}

impl MobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MobKind::Generic => "mob",
            MobKind::Cloud => "cloud",
            MobKind::Fireball => "fireball",
            MobKind::Mushroom => "mushroom",
            MobKind::Koopa => "koopa",
        }
    }
}

/// A mobile enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mob {
    pub kind: MobKind,
    /// Signed horizontal speed; sign is the travel direction
    pub tempo: f32,
    pub weight: f32,
    pub size: Vec2,
    squished: bool,
    /// Seconds until a cloud drops its next fireball
    #[serde(default)]
    pub(crate) fire_timer: f32,
    /// Cloud sway phase (radians)
    #[serde(default)]
    pub(crate) sway: f32,
}

impl Mob {
    fn new(kind: MobKind, size: Vec2, weight: f32, tempo: f32) -> Self {
        Self {
            kind,
            tempo,
            weight,
            size,
            squished: false,
            fire_timer: 0.0,
            sway: 0.0,
        }
    }

    pub fn generic() -> Self {
        Self::new(MobKind::Generic, Vec2::splat(1.0), 100.0, 0.0)
    }

    pub fn cloud() -> Self {
        let mut cloud = Self::new(MobKind::Cloud, Vec2::new(33.0, 21.0), 70.0, 20.0);
        cloud.fire_timer = crate::consts::CLOUD_FIRE_INTERVAL;
        cloud
    }

    pub fn fireball() -> Self {
        Self::new(MobKind::Fireball, Vec2::splat(8.0), 100.0, 0.0)
    }

    pub fn mushroom() -> Self {
        Self::new(MobKind::Mushroom, Vec2::splat(BLOCK_SIZE), 220.0, -40.0)
    }

    pub fn koopa() -> Self {
        Self::new(MobKind::Koopa, Vec2::splat(BLOCK_SIZE), 150.0, -110.0)
    }

    /// Defeated by a stomp (mushroom and koopa only)
    pub fn is_squished(&self) -> bool {
        self.squished
    }

    pub(crate) fn squish(&mut self) {
        self.squished = true;
        self.tempo = 0.0;
    }

    pub fn reverse(&mut self) {
        self.tempo = -self.tempo;
    }

    /// Whether the mob falls under gravity
    pub fn falls(&self) -> bool {
        self.kind != MobKind::Cloud
    }
}

/// What a thing in the world is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Block(Block),
    Mob(Mob),
    Item(Item),
    /// Level edge wall
    Boundary,
    /// Stand-in for an unrecognised level glyph
    Placeholder,
}

impl EntityKind {
    pub fn category(&self) -> Category {
        match self {
            EntityKind::Player => Category::Player,
            EntityKind::Block(_) => Category::Block,
            EntityKind::Mob(_) => Category::Mob,
            EntityKind::Item(_) => Category::Item,
            EntityKind::Boundary | EntityKind::Placeholder => Category::Boundary,
        }
    }

    /// Identity tag shown to renderers and logs
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Block(block) => block.name(),
            EntityKind::Mob(mob) => mob.kind.as_str(),
            EntityKind::Item(item) => item.kind.as_str(),
            EntityKind::Boundary => "boundary",
            EntityKind::Placeholder => "unknown",
        }
    }
}

/// The player's persistent stats (survive level changes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    name: String,
    health: u32,
    max_health: u32,
    score: u64,
    invincible: bool,
    invincible_since: Option<Duration>,
    bigger: bool,
    /// Power-up window opened by stomping a mushroom
    grown: bool,
    /// Horizontal speed cap for movement input
    pub max_velocity: f32,
}

impl Player {
    pub fn new(name: impl Into<String>, max_health: u32, max_velocity: f32) -> Self {
        Self {
            name: name.into(),
            health: max_health,
            max_health,
            score: 0,
            invincible: false,
            invincible_since: None,
            bigger: false,
            grown: false,
            max_velocity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Apply a health change, clamped to [0, max_health]
    pub fn change_health(&mut self, delta: i32) {
        let health = i64::from(self.health) + i64::from(delta);
        self.health = health.clamp(0, i64::from(self.max_health)) as u32;
    }

    pub fn restore_health(&mut self) {
        self.health = self.max_health;
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn change_score(&mut self, gain: u64) {
        self.score = self.score.saturating_add(gain);
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible
    }

    pub fn invincible_since(&self) -> Option<Duration> {
        self.invincible_since
    }

    pub(crate) fn set_invincible(&mut self, now: Duration) {
        self.invincible = true;
        self.invincible_since = Some(now);
    }

    pub(crate) fn clear_invincible(&mut self) {
        self.invincible = false;
        self.invincible_since = None;
    }

    pub fn is_bigger(&self) -> bool {
        self.bigger
    }

    pub(crate) fn set_bigger(&mut self, bigger: bool) {
        self.bigger = bigger;
    }

    pub fn is_grown(&self) -> bool {
        self.grown
    }

    pub(crate) fn set_grown(&mut self, grown: bool) {
        self.grown = grown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_health_clamps_to_range() {
        let mut player = Player::new("mario", 20, 100.0);
        player.change_health(5);
        assert_eq!(player.health(), 20);

        player.change_health(-25);
        assert_eq!(player.health(), 0);
        assert!(player.is_dead());

        player.restore_health();
        assert_eq!(player.health(), 20);
    }

    #[test]
    fn test_switch_disarm_takes_positions() {
        let mut switch = SwitchBlock::default();
        switch.arm(Duration::from_secs(3), vec![Vec2::new(8.0, 8.0)]);
        assert!(switch.is_armed());
        assert_eq!(switch.activated_at(), Some(Duration::from_secs(3)));

        let restored = switch.disarm();
        assert_eq!(restored, vec![Vec2::new(8.0, 8.0)]);
        assert!(!switch.is_armed());
        assert!(switch.removed_bricks().is_empty());
    }

    #[test]
    fn test_placeholder_is_boundary() {
        assert_eq!(EntityKind::Placeholder.category(), Category::Boundary);
        assert_eq!(EntityKind::Block(Block::brick()).name(), "brick");
        assert!(!Block::Plain(Material::BrickBase).is_brick());
    }

    proptest! {
        #[test]
        fn prop_health_stays_in_range(max in 1u32..100, deltas in prop::collection::vec(-50i32..50, 0..40)) {
            let mut player = Player::new("luigi", max, 100.0);
            for delta in deltas {
                player.change_health(delta);
                prop_assert!(player.health() <= player.max_health());
            }
        }
    }
}
