//! Movement Validation
//!
//! Server-side speed clamp and terrain check for proposed positions.
//! Over-speed moves are scaled down rather than rejected so honest
//! clients with clock jitter do not rubber-band; only water destinations
//! are refused outright.

use crate::game::player::Player;
use crate::world::tiles::World;

/// Maximum player speed in world units per second.
pub const MAX_SPEED: f32 = 200.0;

/// Result of validating one proposed move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveOutcome {
    /// Proposal applied as-is. Broadcast, no echo to the sender.
    Accepted { x: f32, y: f32 },
    /// Proposal scaled or clamped. Broadcast, and echo a correction.
    Corrected { x: f32, y: f32 },
    /// Water destination. Player stays put; correction only, no broadcast.
    Rejected,
}

/// Validate a proposed position against elapsed time and terrain.
///
/// Applies the accepted position to the player and always updates
/// `last_move_ms`, even on rejection, so elapsed time cannot be banked
/// across refused moves.
pub fn validate(world: &World, player: &mut Player, x: f32, y: f32, now_ms: u64) -> MoveOutcome {
    let elapsed_secs = player
        .last_move_ms
        .map(|last| (now_ms.saturating_sub(last)) as f32 / 1000.0);
    player.last_move_ms = Some(now_ms);

    let dx = x - player.x;
    let dy = y - player.y;
    let dist = (dx * dx + dy * dy).sqrt();

    let mut corrected = false;
    let (mut nx, mut ny) = (x, y);

    // First-ever move is unconstrained; afterwards displacement is capped
    // at MAX_SPEED * elapsed and scaled down, never refused.
    if let Some(elapsed) = elapsed_secs {
        let max_dist = MAX_SPEED * elapsed;
        if dist > max_dist && dist > 0.0 {
            let scale = max_dist / dist;
            nx = player.x + dx * scale;
            ny = player.y + dy * scale;
            corrected = true;
        }
    }

    let (cx, cy) = world.clamp(nx, ny);
    if cx != nx || cy != ny {
        corrected = true;
    }

    if world.is_blocked_water(cx, cy) {
        return MoveOutcome::Rejected;
    }

    player.x = cx;
    player.y = cy;

    if corrected {
        MoveOutcome::Corrected { x: cx, y: cy }
    } else {
        MoveOutcome::Accepted { x: cx, y: cy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::pick_color;
    use crate::world::tiles::{Rect, Tile, TILE_SIZE, WORLD_H, WORLD_W};
    use proptest::prelude::*;

    fn open_world() -> World {
        World {
            seed: 0,
            tiles: vec![vec![Tile::Grass; WORLD_W]; WORLD_H],
            lakes: Vec::new(),
            decor: Vec::new(),
            city: Rect { x0: 0, y0: 0, x1: 1, y1: 1 },
            shops: Vec::new(),
            spawn: (500.0, 500.0),
        }
    }

    fn player_at(x: f32, y: f32) -> Player {
        let mut p = Player::new("p1".to_string(), (x, y), pick_color(0));
        p.last_move_ms = Some(0);
        p
    }

    #[test]
    fn test_first_move_unconstrained() {
        let world = open_world();
        let mut player = Player::new("p1".to_string(), (100.0, 100.0), pick_color(0));
        assert!(player.last_move_ms.is_none());

        let outcome = validate(&world, &mut player, 3000.0, 2000.0, 1_000);
        assert_eq!(outcome, MoveOutcome::Accepted { x: 3000.0, y: 2000.0 });
        assert_eq!(player.last_move_ms, Some(1_000));
    }

    #[test]
    fn test_within_budget_accepted() {
        let world = open_world();
        let mut player = player_at(500.0, 500.0);

        // 100ms allows 20 units.
        let outcome = validate(&world, &mut player, 515.0, 500.0, 100);
        assert_eq!(outcome, MoveOutcome::Accepted { x: 515.0, y: 500.0 });
    }

    #[test]
    fn test_overspeed_scaled() {
        let world = open_world();
        let mut player = player_at(500.0, 500.0);

        // 100ms budget is 20 units; ask for 200.
        let outcome = validate(&world, &mut player, 700.0, 500.0, 100);
        match outcome {
            MoveOutcome::Corrected { x, y } => {
                assert!((x - 520.0).abs() < 1e-3);
                assert!((y - 500.0).abs() < 1e-3);
            }
            other => panic!("expected correction, got {:?}", other),
        }
        assert!((player.x - 520.0).abs() < 1e-3);
    }

    #[test]
    fn test_water_rejected_position_unchanged() {
        let mut world = open_world();
        let tx = 20usize;
        let ty = 10usize;
        world.tiles[ty][tx] = Tile::Water;

        let start_x = (tx as f32 - 0.5) * TILE_SIZE;
        let start_y = (ty as f32 + 0.5) * TILE_SIZE;
        let mut player = player_at(start_x, start_y);

        let target_x = (tx as f32 + 0.5) * TILE_SIZE;
        let outcome = validate(&world, &mut player, target_x, start_y, 200);

        assert_eq!(outcome, MoveOutcome::Rejected);
        assert_eq!(player.x, start_x);
        assert_eq!(player.y, start_y);
        // Clock still advances on rejection.
        assert_eq!(player.last_move_ms, Some(200));
    }

    #[test]
    fn test_out_of_bounds_clamped() {
        let world = open_world();
        let mut player = player_at(10.0, 10.0);

        let outcome = validate(&world, &mut player, -500.0, 10.0, 10_000);
        match outcome {
            MoveOutcome::Corrected { x, .. } => assert_eq!(x, 0.0),
            other => panic!("expected correction, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_displacement_bounded_by_speed(
            dt_ms in 1u64..5_000,
            dx in -5_000.0f32..5_000.0,
            dy in -5_000.0f32..5_000.0,
        ) {
            let world = open_world();
            let mut player = player_at(2000.0, 1500.0);
            let (sx, sy) = (player.x, player.y);

            let outcome = validate(&world, &mut player, sx + dx, sy + dy, dt_ms);

            if outcome != MoveOutcome::Rejected {
                let moved = ((player.x - sx).powi(2) + (player.y - sy).powi(2)).sqrt();
                let budget = MAX_SPEED * dt_ms as f32 / 1000.0;
                prop_assert!(moved <= budget * 1.001 + 1e-3);
                prop_assert!(!world.is_blocked_water(player.x, player.y));
            }
        }
    }
}
