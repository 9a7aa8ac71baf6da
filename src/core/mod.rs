//! Deterministic primitives shared by world generation and game logic.

pub mod rng;

pub use rng::{derive_seed, GameRng};
