//! World State Definitions
//!
//! The tile grid and everything placed on it. The world is generated once
//! at startup and is read-only afterwards, except for decor appended by
//! player building actions.

use serde::{Deserialize, Serialize};

/// Width of the world in tiles.
pub const WORLD_W: usize = 160;
/// Height of the world in tiles.
pub const WORLD_H: usize = 120;
/// Tile edge length in world units.
pub const TILE_SIZE: f32 = 32.0;

/// Terrain type of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    /// Walkable default terrain.
    Grass,
    /// Lake water. Blocks movement; the only fishable terrain in play.
    Water,
    /// Northern band terrain.
    Mountain,
    /// Southern band terrain.
    Forest,
    /// Halo around lakes.
    Beach,
}

/// A lake recorded during generation (center + radius, tile coordinates).
///
/// Only used while stamping tiles and in tests; gameplay reads the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lake {
    /// Center x in tiles.
    pub cx: i32,
    /// Center y in tiles.
    pub cy: i32,
    /// Radius in tiles.
    pub radius: f64,
}

/// Kind of a decorative element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorKind {
    /// Scattered tree.
    Tree,
    /// Scattered bush.
    Bush,
    /// Scattered rock.
    Rock,
    /// Scattered flower.
    Flower,
    /// City perimeter fence post.
    Fence,
    /// Opening in the city fence.
    Gate,
    /// Shop building marker.
    Shop,
    /// The city NPC.
    Npc,
    /// Player-built element from the build catalog.
    Built,
}

/// A decorative element placed in the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decor {
    /// Element kind.
    pub kind: DecorKind,
    /// World-unit x position.
    pub x: f32,
    /// World-unit y position.
    pub y: f32,
    /// Optional label (shop name, built element id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Axis-aligned tile rectangle, end-exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Inclusive left edge.
    pub x0: i32,
    /// Inclusive top edge.
    pub y0: i32,
    /// Exclusive right edge.
    pub x1: i32,
    /// Exclusive bottom edge.
    pub y1: i32,
}

impl Rect {
    /// Whether the tile coordinate lies inside the rectangle.
    #[inline]
    pub fn contains(&self, tx: i32, ty: i32) -> bool {
        tx >= self.x0 && tx < self.x1 && ty >= self.y0 && ty < self.y1
    }
}

/// A named shop building inside the city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    /// Shop identifier ("rod_shop", "bait_shop", ...).
    pub id: String,
    /// Tile x of the building.
    pub tx: i32,
    /// Tile y of the building.
    pub ty: i32,
}

/// The generated world.
///
/// Immutable after generation except for [`World::add_decor`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    /// Seed the world was generated from.
    pub seed: u64,
    /// Tile grid, indexed `tiles[y][x]`.
    pub tiles: Vec<Vec<Tile>>,
    /// Lakes recorded during generation.
    pub lakes: Vec<Lake>,
    /// Decorative elements, append-only.
    pub decor: Vec<Decor>,
    /// City rectangle (tiles).
    pub city: Rect,
    /// Shop buildings.
    pub shops: Vec<Shop>,
    /// Canonical spawn point in world units.
    pub spawn: (f32, f32),
}

impl World {
    /// World width in world units.
    #[inline]
    pub fn width_units(&self) -> f32 {
        WORLD_W as f32 * TILE_SIZE
    }

    /// World height in world units.
    #[inline]
    pub fn height_units(&self) -> f32 {
        WORLD_H as f32 * TILE_SIZE
    }

    /// Tile under a world-unit position, or `None` outside the grid.
    pub fn tile_at(&self, x: f32, y: f32) -> Option<Tile> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let tx = (x / TILE_SIZE) as usize;
        let ty = (y / TILE_SIZE) as usize;
        self.tiles.get(ty).and_then(|row| row.get(tx)).copied()
    }

    /// Clamp a world-unit position into bounds.
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        let max_x = self.width_units() - 1.0;
        let max_y = self.height_units() - 1.0;
        (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }

    /// Whether the tile under a position blocks movement.
    pub fn is_blocked_water(&self, x: f32, y: f32) -> bool {
        matches!(self.tile_at(x, y), Some(Tile::Water))
    }

    /// Append a decorative element (the only post-generation mutation).
    pub fn add_decor(&mut self, decor: Decor) {
        self.decor.push(decor);
    }

    /// Serializable snapshot for the `init` message.
    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            width: WORLD_W as u32,
            height: WORLD_H as u32,
            tile_size: TILE_SIZE,
            tiles: self
                .tiles
                .iter()
                .map(|row| row.iter().map(|t| *t as u8).collect())
                .collect(),
            decor: self.decor.clone(),
            city: self.city,
            shops: self.shops.clone(),
            spawn: self.spawn,
        }
    }
}

/// Wire snapshot of the world sent to clients on connect.
///
/// Tiles are flattened to `u8` rows to keep the init frame compact.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSummary {
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Tile edge length in world units.
    pub tile_size: f32,
    /// Terrain rows as `Tile` discriminants.
    pub tiles: Vec<Vec<u8>>,
    /// All decorative elements.
    pub decor: Vec<Decor>,
    /// City rectangle (tiles).
    pub city: Rect,
    /// Shop buildings.
    pub shops: Vec<Shop>,
    /// Spawn point in world units.
    pub spawn: (f32, f32),
}
