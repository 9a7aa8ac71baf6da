//! Tidepool Server
//!
//! Authoritative session server for the Tidepool fishing world.
//! Configuration comes from the environment; every knob has a default
//! suitable for local play.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tidepool::core::rng::derive_seed;
use tidepool::game::catalog::Catalog;
use tidepool::game::fishing::FishingEngine;
use tidepool::network::{GameServer, MessageRouter, ServerConfig, SessionRegistry};
use tidepool::persist::ProfileStore;
use tidepool::world::tiles::World;
use tidepool::VERSION;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Tidepool Server v{}", VERSION);

    let config = ServerConfig {
        bind_addr: env_or("TIDEPOOL_ADDR", "0.0.0.0:8080"),
        health_addr: env_or("TIDEPOOL_HEALTH_ADDR", "0.0.0.0:8081"),
        max_players: env_or("TIDEPOOL_MAX_PLAYERS", "64")
            .parse()
            .context("TIDEPOOL_MAX_PLAYERS must be an integer")?,
    };
    let seed_label = env_or("TIDEPOOL_WORLD_SEED", "tidepool");
    let profile_path = env_or("TIDEPOOL_PROFILES", "profiles.json");

    let world_seed = derive_seed(&seed_label);
    let world = World::generate(world_seed);
    info!(
        seed_label = %seed_label,
        world_seed,
        lakes = world.lakes.len(),
        "world generated"
    );

    let store = ProfileStore::load(&profile_path)
        .with_context(|| format!("loading profile store from {}", profile_path))?;
    let registry = SessionRegistry::new(config.max_players);
    let engine = FishingEngine::new(derive_seed(&format!("{}/gameplay", seed_label)));
    let router = MessageRouter::new(world, Catalog::standard(), registry, engine, store);

    let server = GameServer::new(config, router);

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            let _ = shutdown.send(());
        }
    });

    server.run().await.context("server terminated")?;
    Ok(())
}
