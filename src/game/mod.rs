//! Game logic: items, players, movement validation and the fishing
//! minigame.

pub mod catalog;
pub mod fishing;
pub mod movement;
pub mod player;

pub use catalog::{Catalog, Rarity};
pub use fishing::{CastSubmission, CatchOutcome, CatchReport, FishingEngine, FishingSession};
pub use movement::{validate, MoveOutcome, MAX_SPEED};
pub use player::{Player, Profile};
