//! Level loading
//!
//! Levels are plain text grids: one glyph per 16-unit cell, one line per row.
//! A [`WorldBuilder`] turns the grid into a [`World`] by looking each glyph up
//! in a table of builder functions; unknown glyphs become inert placeholders.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use glam::Vec2;

use crate::consts::BLOCK_SIZE;
use crate::sim::entity::{Block, EntityKind, Item, ItemKind, Material, Mob, MysteryBlock};
use crate::sim::world::{Body, World};

/// Block glyphs
pub const BLOCK_GLYPHS: &[char] = &['#', '%', '?', '$', '^', 'b', 'I', '=', 'S'];
/// Item glyphs
pub const ITEM_GLYPHS: &[char] = &['C', '*'];
/// Mob glyphs
pub const MOB_GLYPHS: &[char] = &['&', '@', '6'];

/// Goal flag size in cells
const GOAL_CELLS: Vec2 = Vec2::new(0.2, 9.0);
/// Tunnel size in cells
const TUNNEL_CELLS: Vec2 = Vec2::new(2.0, 2.0);

/// Where level text comes from
pub trait LevelSource {
    fn read_level(&self, name: &str) -> Result<String>;
}

/// Level files in a directory
#[derive(Debug, Clone)]
pub struct LevelDir {
    root: PathBuf,
}

impl LevelDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LevelSource for LevelDir {
    fn read_level(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).with_context(|| format!("reading level {}", path.display()))
    }
}

/// Levels held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLevels {
    levels: HashMap<String, String>,
}

impl MemoryLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.levels.insert(name.into(), text.into());
    }
}

impl LevelSource for MemoryLevels {
    fn read_level(&self, name: &str) -> Result<String> {
        self.levels
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no level named {}", name))
    }
}

/// Adds whatever a glyph stands for to the world; `cell` is the top-left
/// corner of the glyph's cell
pub type BuildFn = fn(&mut World, char, Vec2);

/// Builds worlds from level text
#[derive(Clone)]
pub struct WorldBuilder {
    block_size: f32,
    gravity: f32,
    builders: HashMap<char, BuildFn>,
    fallback: BuildFn,
}

impl WorldBuilder {
    pub fn new(block_size: f32, gravity: f32, fallback: BuildFn) -> Self {
        Self {
            block_size,
            gravity,
            builders: HashMap::new(),
            fallback,
        }
    }

    /// Builder with every glyph of the game registered
    pub fn standard(gravity: f32) -> Self {
        let mut builder = Self::new(BLOCK_SIZE, gravity, create_unknown);
        builder.register_builders(BLOCK_GLYPHS, create_block);
        builder.register_builders(ITEM_GLYPHS, create_item);
        builder.register_builders(MOB_GLYPHS, create_mob);
        builder
    }

    pub fn register_builders(&mut self, glyphs: &[char], build: BuildFn) {
        for glyph in glyphs {
            self.builders.insert(*glyph, build);
        }
    }

    /// Build a world from level text
    pub fn build(&self, text: &str) -> World {
        let rows: Vec<&str> = text.lines().collect();
        let cols = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let size = Vec2::new(cols as f32, rows.len() as f32) * self.block_size;
        let mut world = World::new(self.gravity, size);

        for (y, row) in rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                if glyph == ' ' {
                    continue;
                }
                let cell = Vec2::new(x as f32, y as f32) * self.block_size;
                let build = self.builders.get(&glyph).copied().unwrap_or(self.fallback);
                build(&mut world, glyph, cell);
            }
        }

        add_boundaries(&mut world, size, self.block_size);
        world
    }

    /// Read and build a named level
    pub fn load(&self, source: &dyn LevelSource, name: &str) -> Result<World> {
        let text = source.read_level(name)?;
        let world = self.build(&text);
        log::info!(
            "Built level {} ({}x{} units, {} things)",
            name,
            world.pixel_size().x,
            world.pixel_size().y,
            world.len()
        );
        Ok(world)
    }
}

/// Walls down both sides and along the bottom
fn add_boundaries(world: &mut World, size: Vec2, thickness: f32) {
    let wall = Vec2::new(thickness, size.y * 2.0);
    world.add(
        EntityKind::Boundary,
        Body::fixed(Vec2::new(-thickness / 2.0, 0.0), wall),
    );
    world.add(
        EntityKind::Boundary,
        Body::fixed(Vec2::new(size.x + thickness / 2.0, 0.0), wall),
    );
    world.add(
        EntityKind::Boundary,
        Body::fixed(
            Vec2::new(size.x / 2.0, size.y + thickness / 2.0),
            Vec2::new(size.x + thickness * 2.0, thickness),
        ),
    );
}

/// Centre of a box of `size` sitting on the bottom edge of a cell
fn anchored(cell: Vec2, size: Vec2) -> Vec2 {
    Vec2::new(cell.x + size.x / 2.0, cell.y + BLOCK_SIZE - size.y / 2.0)
}

/// Block for a glyph and its size in cells
pub fn block_for(glyph: char) -> Option<(Block, Vec2)> {
    let block = match glyph {
        '#' => Block::brick(),
        '%' => Block::Plain(Material::BrickBase),
        '^' => Block::Plain(Material::Cube),
        '?' => Block::Mystery(MysteryBlock::empty()),
        '$' => Block::Mystery(MysteryBlock::with_drop(ItemKind::Coin, (3, 6))),
        'b' => Block::bounce(),
        'I' => return Some((Block::Goal, GOAL_CELLS)),
        '=' => return Some((Block::Tunnel, TUNNEL_CELLS)),
        'S' => Block::Switch(Default::default()),
        _ => return None,
    };
    Some((block, Vec2::ONE))
}

pub fn item_for(glyph: char) -> Option<Item> {
    match glyph {
        'C' => Some(Item::coin(1)),
        '*' => Some(Item::star()),
        _ => None,
    }
}

pub fn mob_for(glyph: char) -> Option<Mob> {
    match glyph {
        '&' => Some(Mob::cloud()),
        '@' => Some(Mob::mushroom()),
        '6' => Some(Mob::koopa()),
        _ => None,
    }
}

fn create_block(world: &mut World, glyph: char, cell: Vec2) {
    let Some((block, cells)) = block_for(glyph) else {
        return create_unknown(world, glyph, cell);
    };
    let size = cells * BLOCK_SIZE;
    world.add(EntityKind::Block(block), Body::fixed(anchored(cell, size), size));
}

fn create_item(world: &mut World, glyph: char, cell: Vec2) {
    let Some(item) = item_for(glyph) else {
        return create_unknown(world, glyph, cell);
    };
    let size = item.size();
    world.add(EntityKind::Item(item), Body::fixed(anchored(cell, size), size));
}

/// Glyphs registered as mobs without a dedicated kind become generic mobs
pub fn create_mob(world: &mut World, glyph: char, cell: Vec2) {
    let mob = mob_for(glyph).unwrap_or_else(|| {
        log::debug!("mob glyph {:?} has no kind of its own, using a generic mob", glyph);
        Mob::generic()
    });
    let pos = anchored(cell, mob.size);
    let body = if mob.falls() {
        Body::dynamic(pos, mob.size, mob.weight)
    } else {
        Body::floating(pos, mob.size, mob.weight)
    };
    world.add(EntityKind::Mob(mob), body);
}

fn create_unknown(world: &mut World, glyph: char, cell: Vec2) {
    log::warn!("unknown level glyph {:?} at {:?}, placing a placeholder", glyph, cell);
    let size = Vec2::splat(BLOCK_SIZE);
    world.add(EntityKind::Placeholder, Body::fixed(anchored(cell, size), size));
}
