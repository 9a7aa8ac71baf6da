//! Procedural world: tile grid, lakes, city and decor.

pub mod generator;
pub mod tiles;

pub use tiles::{Decor, DecorKind, Lake, Rect, Shop, Tile, World, WorldSummary};
pub use tiles::{TILE_SIZE, WORLD_H, WORLD_W};
