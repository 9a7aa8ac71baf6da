//! Procedural World Generation
//!
//! Builds the static world from a seed: terrain bands, city, lakes with
//! irregular shores, beach halos, decor scatter and shop placement.
//! Generation is pure - the same seed always yields the same world.

use crate::core::rng::GameRng;
use crate::world::tiles::{
    Decor, DecorKind, Lake, Rect, Shop, Tile, World, TILE_SIZE, WORLD_H, WORLD_W,
};

/// City footprint in tiles.
const CITY_W: i32 = 20;
const CITY_H: i32 = 14;

/// Fraction of rows covered by the northern mountain band.
const MOUNTAIN_BAND: f64 = 0.19;
/// Fraction of rows covered by the southern forest band.
const FOREST_BAND: f64 = 0.25;

/// Per-tile probability inside a terrain band.
const MOUNTAIN_DENSITY: f64 = 0.78;
const FOREST_DENSITY: f64 = 0.70;

/// Lake placement attempts before the lake is skipped.
const LAKE_MAX_ATTEMPTS: u32 = 100;

/// Scatter attempt counts per decor kind.
const TREE_ATTEMPTS: u32 = 140;
const BUSH_ATTEMPTS: u32 = 90;
const ROCK_ATTEMPTS: u32 = 60;
const FLOWER_ATTEMPTS: u32 = 110;

impl World {
    /// Generate the world from a seed.
    ///
    /// Deterministic: identical seeds yield identical tile grids, lakes,
    /// decor and shop positions.
    pub fn generate(seed: u64) -> World {
        let mut rng = GameRng::new(seed);

        let mut tiles = vec![vec![Tile::Grass; WORLD_W]; WORLD_H];

        // Stochastic terrain bands. These run before the city is carved so
        // the city-is-grass invariant holds unconditionally.
        let mountain_rows = (WORLD_H as f64 * MOUNTAIN_BAND) as usize;
        let forest_start = WORLD_H - (WORLD_H as f64 * FOREST_BAND) as usize;
        for (ty, row) in tiles.iter_mut().enumerate() {
            for tile in row.iter_mut() {
                if ty < mountain_rows && rng.chance(MOUNTAIN_DENSITY) {
                    *tile = Tile::Mountain;
                } else if ty >= forest_start && rng.chance(FOREST_DENSITY) {
                    *tile = Tile::Forest;
                }
            }
        }

        // Carve the city rectangle near the map center, after the bands.
        let city = Rect {
            x0: (WORLD_W as i32 - CITY_W) / 2,
            y0: (WORLD_H as i32 - CITY_H) / 2,
            x1: (WORLD_W as i32 - CITY_W) / 2 + CITY_W,
            y1: (WORLD_H as i32 - CITY_H) / 2 + CITY_H,
        };
        for ty in city.y0..city.y1 {
            for tx in city.x0..city.x1 {
                tiles[ty as usize][tx as usize] = Tile::Grass;
            }
        }

        // Lakes with wobbled shores and a beach halo.
        let lake_count = 8 + rng.next_int(5);
        let mut lakes = Vec::new();
        for _ in 0..lake_count {
            if let Some(lake) = place_lake(&mut rng, &city) {
                stamp_lake(&mut tiles, &city, &lake);
                lakes.push(lake);
            }
        }
        stamp_beaches(&mut tiles, &city);

        // Decor scatter on open grass.
        let mut decor = Vec::new();
        scatter(&mut rng, &tiles, &mut decor, DecorKind::Tree, TREE_ATTEMPTS);
        scatter(&mut rng, &tiles, &mut decor, DecorKind::Bush, BUSH_ATTEMPTS);
        scatter(&mut rng, &tiles, &mut decor, DecorKind::Rock, ROCK_ATTEMPTS);
        scatter(&mut rng, &tiles, &mut decor, DecorKind::Flower, FLOWER_ATTEMPTS);

        // City furniture: fence ring with a gate, shops, one NPC.
        let shops = place_city(&city, &mut decor);

        let spawn = (
            (city.x0 + city.x1) as f32 * 0.5 * TILE_SIZE,
            (city.y0 + city.y1) as f32 * 0.5 * TILE_SIZE,
        );

        World {
            seed,
            tiles,
            lakes,
            decor,
            city,
            shops,
            spawn,
        }
    }
}

/// Sample a lake center and radius outside the city footprint.
///
/// Returns `None` when no valid position is found within the attempt
/// budget; the lake is then skipped rather than forced.
fn place_lake(rng: &mut GameRng, city: &Rect) -> Option<Lake> {
    for _ in 0..LAKE_MAX_ATTEMPTS {
        let radius = rng.next_range(4.0, 9.0);
        let margin = radius.ceil() as i32 + 2;
        let cx = margin + rng.next_int((WORLD_W as i32 - 2 * margin) as u32) as i32;
        let cy = margin + rng.next_int((WORLD_H as i32 - 2 * margin) as u32) as i32;

        // Keep the lake and its beach halo clear of the city.
        let nearest_x = cx.clamp(city.x0, city.x1 - 1);
        let nearest_y = cy.clamp(city.y0, city.y1 - 1);
        let dx = (cx - nearest_x) as f64;
        let dy = (cy - nearest_y) as f64;
        if (dx * dx + dy * dy).sqrt() < radius + 3.0 {
            continue;
        }

        return Some(Lake { cx, cy, radius });
    }
    None
}

/// Shore wobble: sinusoidal offset so lake edges are irregular.
fn wobble(tx: i32, ty: i32) -> f64 {
    ((tx as f64 * 0.7).sin() + (ty as f64 * 0.9).cos()) * 0.9
}

/// Stamp water tiles for one lake. City tiles are never overwritten.
fn stamp_lake(tiles: &mut [Vec<Tile>], city: &Rect, lake: &Lake) {
    let reach = lake.radius.ceil() as i32 + 2;
    for ty in (lake.cy - reach).max(0)..(lake.cy + reach + 1).min(WORLD_H as i32) {
        for tx in (lake.cx - reach).max(0)..(lake.cx + reach + 1).min(WORLD_W as i32) {
            if city.contains(tx, ty) {
                continue;
            }
            let dx = (tx - lake.cx) as f64;
            let dy = (ty - lake.cy) as f64;
            if (dx * dx + dy * dy).sqrt() + wobble(tx, ty) < lake.radius {
                tiles[ty as usize][tx as usize] = Tile::Water;
            }
        }
    }
}

/// Convert grass tiles within a 1-tile Chebyshev radius of water to beach.
fn stamp_beaches(tiles: &mut Vec<Vec<Tile>>, city: &Rect) {
    let mut beaches = Vec::new();
    for ty in 0..WORLD_H as i32 {
        for tx in 0..WORLD_W as i32 {
            if tiles[ty as usize][tx as usize] != Tile::Grass || city.contains(tx, ty) {
                continue;
            }
            'scan: for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (tx + dx, ty + dy);
                    if nx < 0 || ny < 0 || nx >= WORLD_W as i32 || ny >= WORLD_H as i32 {
                        continue;
                    }
                    if tiles[ny as usize][nx as usize] == Tile::Water {
                        beaches.push((tx, ty));
                        break 'scan;
                    }
                }
            }
        }
    }
    for (tx, ty) in beaches {
        tiles[ty as usize][tx as usize] = Tile::Beach;
    }
}

/// Scatter decor of one kind at uniform tile coordinates.
///
/// Positions within 2 tiles of the map edge or not on grass are rejected,
/// so the realized count varies with the seed.
fn scatter(
    rng: &mut GameRng,
    tiles: &[Vec<Tile>],
    decor: &mut Vec<Decor>,
    kind: DecorKind,
    attempts: u32,
) {
    for _ in 0..attempts {
        let tx = rng.next_int(WORLD_W as u32) as i32;
        let ty = rng.next_int(WORLD_H as u32) as i32;
        if tx < 2 || ty < 2 || tx >= WORLD_W as i32 - 2 || ty >= WORLD_H as i32 - 2 {
            continue;
        }
        if tiles[ty as usize][tx as usize] != Tile::Grass {
            continue;
        }
        decor.push(Decor {
            kind,
            x: (tx as f32 + 0.5) * TILE_SIZE,
            y: (ty as f32 + 0.5) * TILE_SIZE,
            label: None,
        });
    }
}

/// Place the city fence, gate, shop buildings and NPC.
fn place_city(city: &Rect, decor: &mut Vec<Decor>) -> Vec<Shop> {
    let gate_x = (city.x0 + city.x1) / 2;

    let mut fence_at = |tx: i32, ty: i32| {
        decor.push(Decor {
            kind: DecorKind::Fence,
            x: (tx as f32 + 0.5) * TILE_SIZE,
            y: (ty as f32 + 0.5) * TILE_SIZE,
            label: None,
        });
    };

    for tx in city.x0..city.x1 {
        fence_at(tx, city.y0);
        // Two-tile gap for the gate in the south fence.
        if tx != gate_x && tx != gate_x - 1 {
            fence_at(tx, city.y1 - 1);
        }
    }
    for ty in (city.y0 + 1)..(city.y1 - 1) {
        fence_at(city.x0, ty);
        fence_at(city.x1 - 1, ty);
    }

    decor.push(Decor {
        kind: DecorKind::Gate,
        x: gate_x as f32 * TILE_SIZE,
        y: (city.y1 as f32 - 0.5) * TILE_SIZE,
        label: None,
    });

    // Shop buildings at fixed offsets inside the corners.
    let positions = [
        ("rod_shop", city.x0 + 2, city.y0 + 2),
        ("bait_shop", city.x1 - 3, city.y0 + 2),
        ("market", city.x0 + 2, city.y1 - 3),
        ("workshop", city.x1 - 3, city.y1 - 3),
    ];
    let shops: Vec<Shop> = positions
        .iter()
        .map(|(id, tx, ty)| Shop {
            id: (*id).to_string(),
            tx: *tx,
            ty: *ty,
        })
        .collect();
    for shop in &shops {
        decor.push(Decor {
            kind: DecorKind::Shop,
            x: (shop.tx as f32 + 0.5) * TILE_SIZE,
            y: (shop.ty as f32 + 0.5) * TILE_SIZE,
            label: Some(shop.id.clone()),
        });
    }

    decor.push(Decor {
        kind: DecorKind::Npc,
        x: (city.x0 + city.x1) as f32 * 0.5 * TILE_SIZE,
        y: (city.y0 + city.y1) as f32 * 0.5 * TILE_SIZE,
        label: Some("harbormaster".to_string()),
    });

    shops
}
