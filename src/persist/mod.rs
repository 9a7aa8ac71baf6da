//! Durable player-profile persistence.

pub mod store;

pub use store::{FlushJob, ProfileStore, StoreError, FLUSH_INTERVAL_MS};
