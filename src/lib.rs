//! # Tidepool Server
//!
//! Authoritative session server for a small multiplayer fishing world.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TIDEPOOL SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG, seed derivation │
//! │                                                              │
//! │  world/          - Procedural world (deterministic)          │
//! │  ├── tiles.rs    - Tile grid, decor, city, shops             │
//! │  └── generator.rs- Terrain bands, lakes, beaches, scatter    │
//! │                                                              │
//! │  game/           - Game rules (server-authoritative)         │
//! │  ├── catalog.rs  - Gear, species, materials, build elements  │
//! │  ├── player.rs   - Player state, XP curve, profiles          │
//! │  ├── movement.rs - Speed clamp and terrain validation        │
//! │  └── fishing.rs  - Minigame sessions and reward resolution   │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - JSON message types                        │
//! │  ├── registry.rs - Per-connection state and fan-out          │
//! │  ├── router.rs   - Message dispatch onto game state          │
//! │  └── server.rs   - WebSocket accept loop, liveness probe     │
//! │                                                              │
//! │  persist/        - Durable state                             │
//! │  └── store.rs    - Token-keyed profile store, debounced      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! Clients propose, the server decides. Every client-reported value is
//! clamped or validated before it touches game state: movement is
//! speed-limited and terrain-checked, fishing scores are clamped to
//! `[0, 1]`, and purchases re-check gold and ownership server-side.
//! World generation and gameplay RNG are seeded, so a given seed label
//! reproduces the same world and the same draw sequence.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod persist;
pub mod world;

// Re-export commonly used types
pub use crate::core::rng::{derive_seed, GameRng};
pub use crate::game::catalog::{Catalog, Rarity};
pub use crate::game::fishing::FishingEngine;
pub use crate::game::player::Player;
pub use crate::network::{GameServer, MessageRouter, ServerConfig, SessionRegistry};
pub use crate::persist::ProfileStore;
pub use crate::world::tiles::World;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
