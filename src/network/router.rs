//! Message Router
//!
//! One handler per client message type, dispatching onto the shared game
//! state. Handlers run start-to-finish under the state lock, so each
//! message observes and produces a consistent world; nothing awaits while
//! the lock is held.
//!
//! Replies follow a fixed shape: direct acks go to the acting client,
//! world-visible effects are broadcast, and validation failures become
//! structured `ok: false` replies rather than dropped frames.

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::game::catalog::Catalog;
use crate::game::fishing::{
    CastSubmission, FishingEngine, ResolveError, SESSION_TTL_MS,
};
use crate::game::movement::{self, MoveOutcome};
use crate::game::player::MAX_NAME_LEN;
use crate::network::protocol::{ClientMessage, PlayerPublic, ProfileBody, ServerMessage};
use crate::network::registry::{Outbound, SessionRegistry};
use crate::persist::{FlushJob, ProfileStore};
use crate::world::tiles::{Decor, DecorKind, World};

/// Chat line length cap (characters).
const MAX_CHAT_LEN: usize = 200;

/// Mutable server state guarded by one lock.
pub struct GameState {
    /// Generated world, decor appended by builds.
    pub world: World,
    /// Per-connection players, senders, sessions and cooldowns.
    pub registry: SessionRegistry,
    /// Fishing rules and gameplay RNG.
    pub engine: FishingEngine,
    /// Durable profile documents.
    pub store: ProfileStore,
}

/// Routes parsed client messages to game-state mutations and replies.
pub struct MessageRouter {
    catalog: Catalog,
    state: Mutex<GameState>,
}

impl MessageRouter {
    /// Assemble a router over freshly constructed state.
    pub fn new(
        world: World,
        catalog: Catalog,
        registry: SessionRegistry,
        engine: FishingEngine,
        store: ProfileStore,
    ) -> Self {
        Self {
            catalog,
            state: Mutex::new(GameState {
                world,
                registry,
                engine,
                store,
            }),
        }
    }

    /// Register a new connection and emit the init/join messages.
    ///
    /// At capacity the connection is refused with a `full` notice sent
    /// directly on the provided channel.
    pub async fn handle_connect(&self, sender: Outbound) -> Option<String> {
        let mut state = self.state.lock().await;

        if state.registry.is_full() {
            info!("connection refused: at capacity");
            if let Ok(frame) = (ServerMessage::Full {
                msg: "server full".to_string(),
            })
            .to_json()
            {
                let _ = sender.send(frame);
            }
            return None;
        }

        let spawn = state.world.spawn;
        let id = state.registry.connect(spawn, sender)?;

        let you = state.registry.player(&id).cloned()?;
        let init = ServerMessage::Init {
            you: Box::new(you.clone()),
            map: Box::new(state.world.summary()),
            players: state.registry.players_except(&id),
            scoreboard: state.registry.scoreboard(),
        };
        state.registry.send_to(&id, &init);
        state.registry.broadcast(
            &ServerMessage::Join {
                player: PlayerPublic::from(&you),
            },
            Some(&id),
        );
        Some(id)
    }

    /// Tear down a connection, persisting its profile first.
    pub async fn handle_disconnect(&self, id: &str) {
        let mut state = self.state.lock().await;
        persist_player(&mut state, id);
        if state.registry.disconnect(id).is_some() {
            state
                .registry
                .broadcast(&ServerMessage::Leave { id: id.to_string() }, None);
            let scoreboard = state.registry.scoreboard();
            state
                .registry
                .broadcast(&ServerMessage::Scoreboard { scoreboard }, None);
        }
    }

    /// Parse and dispatch one inbound frame.
    pub async fn handle_frame(&self, id: &str, text: &str, now_ms: u64) {
        let msg = match ClientMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(player = %id, error = %e, "unparseable frame dropped");
                return;
            }
        };

        let mut state = self.state.lock().await;
        let state = &mut *state;
        match msg {
            ClientMessage::Resume { token } => self.on_resume(state, id, token),
            ClientMessage::Move { x, y, dir } => self.on_move(state, id, x, y, dir, now_ms),
            ClientMessage::StartFishing {} => self.on_start_fishing(state, id, now_ms),
            ClientMessage::FishingResult {
                score,
                perfects,
                cast_power,
            } => self.on_fishing_result(
                state,
                id,
                CastSubmission {
                    score,
                    perfects,
                    cast_power,
                },
                now_ms,
            ),
            ClientMessage::SellAll {} => self.on_sell_all(state, id),
            ClientMessage::BuyItem { category, item_id } => {
                self.on_buy_item(state, id, &category, &item_id)
            }
            ClientMessage::Equip { rod, hook, bait } => {
                self.on_equip(state, id, rod, hook, bait)
            }
            ClientMessage::SetName { name } => self.on_set_name(state, id, &name),
            ClientMessage::Chat { text } => self.on_chat(state, id, &text),
            ClientMessage::BuildElement { element_id, x, y } => {
                self.on_build(state, id, &element_id, x, y)
            }
            ClientMessage::ResetCharacter {} => self.on_reset(state, id),
        }
    }

    /// Debounced profile flush, driven by the server's periodic task.
    ///
    /// Serialization happens under the state lock; the blocking disk
    /// write runs with the lock released, so a slow disk never stalls
    /// message handling.
    pub async fn flush_profiles(&self, now_ms: u64) {
        let job = {
            let mut state = self.state.lock().await;
            state.store.snapshot_if_due(now_ms)
        };
        if let Some(job) = job {
            self.run_flush(job).await;
        }
    }

    /// Unconditional flush for shutdown.
    pub async fn flush_now(&self, now_ms: u64) {
        let job = {
            let mut state = self.state.lock().await;
            state.store.snapshot(now_ms)
        };
        if let Some(job) = job {
            self.run_flush(job).await;
        }
    }

    /// Write a serialized document off the async threads. A failed write
    /// re-marks the store dirty so the next cycle retries.
    async fn run_flush(&self, job: FlushJob) {
        match tokio::task::spawn_blocking(move || job.write()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "profile flush failed");
                self.state.lock().await.store.mark_dirty();
            }
            Err(e) => {
                error!(error = %e, "profile flush task failed");
                self.state.lock().await.store.mark_dirty();
            }
        }
    }

    fn on_resume(&self, state: &mut GameState, id: &str, token: String) {
        if token.is_empty() {
            return;
        }
        let GameState {
            registry, store, ..
        } = state;
        let Some(player) = registry.player_mut(id) else {
            return;
        };
        player.token = Some(token.clone());
        match store.get(&token) {
            Some(profile) => {
                let profile = profile.clone();
                player.hydrate(&profile);
                info!(player = %id, "profile resumed");
            }
            None => {
                let profile = player.to_profile();
                store.upsert(&token, profile);
            }
        }
        let name = player.name.clone();
        let body = ProfileBody::from(&*player);
        registry.send_to(id, &ServerMessage::Profile(body));
        registry.broadcast(
            &ServerMessage::Rename {
                id: id.to_string(),
                name,
            },
            Some(id),
        );
        // Restored stats can reorder the scoreboard.
        let scoreboard = registry.scoreboard();
        registry.broadcast(&ServerMessage::Scoreboard { scoreboard }, None);
    }

    fn on_move(&self, state: &mut GameState, id: &str, x: f32, y: f32, dir: String, now_ms: u64) {
        let GameState {
            world, registry, ..
        } = state;
        let Some(player) = registry.player_mut(id) else {
            return;
        };
        player.dir = dir;

        match movement::validate(world, player, x, y, now_ms) {
            MoveOutcome::Accepted { x, y } => {
                let dir = player.dir.clone();
                registry.broadcast(
                    &ServerMessage::State {
                        id: id.to_string(),
                        x,
                        y,
                        dir,
                    },
                    Some(id),
                );
            }
            MoveOutcome::Corrected { x, y } => {
                let dir = player.dir.clone();
                registry.broadcast(
                    &ServerMessage::State {
                        id: id.to_string(),
                        x,
                        y,
                        dir: dir.clone(),
                    },
                    Some(id),
                );
                registry.send_to(
                    id,
                    &ServerMessage::Corr {
                        id: id.to_string(),
                        x,
                        y,
                        dir,
                    },
                );
            }
            MoveOutcome::Rejected => {
                let (px, py, dir) = (player.x, player.y, player.dir.clone());
                registry.send_to(
                    id,
                    &ServerMessage::Corr {
                        id: id.to_string(),
                        x: px,
                        y: py,
                        dir,
                    },
                );
            }
        }
    }

    fn on_start_fishing(&self, state: &mut GameState, id: &str, now_ms: u64) {
        let GameState {
            registry, engine, ..
        } = state;
        // An abandoned session past its TTL must not block the next cast.
        if registry
            .session(id)
            .is_some_and(|s| now_ms > s.expires_at_ms)
        {
            registry.take_session(id);
        }
        let Some(player) = registry.player(id) else {
            return;
        };
        let has_active = registry.has_session(id);
        let last_cast = registry.last_cast_ms(id);

        match engine.start(&self.catalog, player, has_active, last_cast, now_ms) {
            Some(session) => {
                let reply = ServerMessage::FishingStart {
                    fish_id: session.fish_id.clone(),
                    time_limit_ms: SESSION_TTL_MS,
                    cast_time_ms: session.cast_time_ms,
                    minigame: session.minigame,
                };
                registry.insert_session(id, session);
                registry.set_last_cast(id, now_ms);
                registry.send_to(id, &reply);
            }
            None => registry.send_to(id, &ServerMessage::FishingDenied {}),
        }
    }

    fn on_fishing_result(
        &self,
        state: &mut GameState,
        id: &str,
        submission: CastSubmission,
        now_ms: u64,
    ) {
        let GameState {
            registry, engine, ..
        } = state;
        let Some(session) = registry.take_session(id) else {
            registry.send_to(
                id,
                &ServerMessage::FishResult {
                    ok: false,
                    reason: Some("no-session".to_string()),
                    catch: None,
                    xp_gain: None,
                },
            );
            return;
        };
        let Some(player) = registry.player_mut(id) else {
            return;
        };

        match engine.resolve(&self.catalog, player, &session, &submission, now_ms) {
            Ok(outcome) => {
                let name = player.name.clone();
                let level = player.level;
                let body = ProfileBody::from(&*player);

                registry.send_to(
                    id,
                    &ServerMessage::FishResult {
                        ok: true,
                        reason: None,
                        catch: Some(outcome.catch.clone()),
                        xp_gain: Some(outcome.xp_gain),
                    },
                );
                registry.send_to(id, &ServerMessage::Profile(body));
                let scoreboard = registry.scoreboard();
                registry.broadcast(
                    &ServerMessage::FishEvent {
                        id: id.to_string(),
                        name,
                        catch: outcome.catch,
                        scoreboard,
                    },
                    None,
                );
                if outcome.levels_gained > 0 {
                    registry.broadcast(
                        &ServerMessage::LevelUp {
                            id: id.to_string(),
                            level,
                        },
                        None,
                    );
                }
                persist_player(state, id);
            }
            Err(ResolveError::Expired) => {
                registry.send_to(
                    id,
                    &ServerMessage::FishResult {
                        ok: false,
                        reason: Some("expired".to_string()),
                        catch: None,
                        xp_gain: None,
                    },
                );
            }
        }
    }

    fn on_sell_all(&self, state: &mut GameState, id: &str) {
        let Some(player) = state.registry.player_mut(id) else {
            return;
        };
        let earned: u64 = player.bag.iter().map(|item| item.price()).sum();
        let sold = player.bag.len() as u32;
        player.gold += earned;
        player.bag.clear();
        let gold = player.gold;

        state.registry.send_to(
            id,
            &ServerMessage::SellResult {
                ok: true,
                earned,
                gold,
                sold,
            },
        );
        let scoreboard = state.registry.scoreboard();
        state
            .registry
            .broadcast(&ServerMessage::Scoreboard { scoreboard }, None);
        persist_player(state, id);
    }

    fn on_buy_item(&self, state: &mut GameState, id: &str, category: &str, item_id: &str) {
        let Some(player) = state.registry.player_mut(id) else {
            return;
        };

        let cost = match category {
            "rod" => self.catalog.rod(item_id).map(|d| d.cost),
            "hook" => self.catalog.hook(item_id).map(|d| d.cost),
            "bait" => self.catalog.bait(item_id).map(|d| d.cost),
            _ => None,
        };
        let Some(cost) = cost else {
            buy_failure(&state.registry, id, "unknown-item");
            return;
        };
        if player.inventory.owns(category, item_id) {
            buy_failure(&state.registry, id, "already-owned");
            return;
        }
        if player.gold < cost {
            buy_failure(&state.registry, id, "insufficient-gold");
            return;
        }

        player.gold -= cost;
        match category {
            "rod" => player.inventory.rods.push(item_id.to_string()),
            "hook" => player.inventory.hooks.push(item_id.to_string()),
            _ => player.inventory.baits.push(item_id.to_string()),
        }
        let gold = player.gold;
        let inventory = player.inventory.clone();

        state.registry.send_to(
            id,
            &ServerMessage::BuyResult {
                ok: true,
                gold: Some(gold),
                inventory: Some(inventory),
                reason: None,
            },
        );
        persist_player(state, id);
    }

    fn on_equip(
        &self,
        state: &mut GameState,
        id: &str,
        rod: Option<String>,
        hook: Option<String>,
        bait: Option<String>,
    ) {
        let Some(player) = state.registry.player_mut(id) else {
            return;
        };

        // The whole request is validated before any slot changes.
        let slots = [("rod", &rod), ("hook", &hook), ("bait", &bait)];
        for (category, item) in slots {
            if let Some(item_id) = item {
                if !player.inventory.owns(category, item_id) {
                    state.registry.send_to(
                        id,
                        &ServerMessage::EquipAck {
                            ok: false,
                            equipment: None,
                            reason: Some("not-owned".to_string()),
                        },
                    );
                    return;
                }
            }
        }

        if let Some(rod) = rod {
            player.equipment.rod = rod;
        }
        if let Some(hook) = hook {
            player.equipment.hook = hook;
        }
        if let Some(bait) = bait {
            player.equipment.bait = Some(bait);
        }
        let equipment = player.equipment.clone();

        state.registry.send_to(
            id,
            &ServerMessage::EquipAck {
                ok: true,
                equipment: Some(equipment),
                reason: None,
            },
        );
        persist_player(state, id);
    }

    fn on_set_name(&self, state: &mut GameState, id: &str, name: &str) {
        let trimmed: String = name.trim().chars().take(MAX_NAME_LEN).collect();
        if trimmed.is_empty() {
            return;
        }
        let Some(player) = state.registry.player_mut(id) else {
            return;
        };
        player.name = trimmed.clone();

        state.registry.send_to(
            id,
            &ServerMessage::NameAck {
                id: id.to_string(),
                name: trimmed.clone(),
            },
        );
        state.registry.broadcast(
            &ServerMessage::Rename {
                id: id.to_string(),
                name: trimmed,
            },
            Some(id),
        );
        persist_player(state, id);
    }

    fn on_chat(&self, state: &mut GameState, id: &str, text: &str) {
        let line: String = text.trim().chars().take(MAX_CHAT_LEN).collect();
        if line.is_empty() {
            return;
        }
        let Some(player) = state.registry.player(id) else {
            return;
        };
        let name = player.name.clone();
        state.registry.broadcast(
            &ServerMessage::Chat {
                id: id.to_string(),
                name,
                text: line,
            },
            None,
        );
    }

    fn on_build(&self, state: &mut GameState, id: &str, element_id: &str, x: f32, y: f32) {
        let GameState {
            world, registry, ..
        } = state;
        let Some(player) = registry.player_mut(id) else {
            return;
        };

        let Some(def) = self.catalog.build_element(element_id) else {
            build_failure(registry, id, "unknown-element");
            return;
        };
        match world.tile_at(x, y) {
            Some(tile) if !matches!(tile, crate::world::tiles::Tile::Water) => {}
            _ => {
                build_failure(registry, id, "invalid-position");
                return;
            }
        }
        if player.gold < def.gold_cost {
            build_failure(registry, id, "insufficient-gold");
            return;
        }
        for cost in &def.materials {
            if player.inventory.material_count(cost.material) < cost.count {
                build_failure(registry, id, "insufficient-materials");
                return;
            }
        }

        player.gold -= def.gold_cost;
        for cost in &def.materials {
            if let Some(count) = player.inventory.materials.get_mut(cost.material) {
                *count -= cost.count;
                if *count == 0 {
                    player.inventory.materials.remove(cost.material);
                }
            }
        }

        let decor = Decor {
            kind: DecorKind::Built,
            x,
            y,
            label: Some(def.id.to_string()),
        };
        world.add_decor(decor.clone());

        registry.send_to(
            id,
            &ServerMessage::BuildResult {
                success: true,
                element: Some(decor.clone()),
                reason: None,
            },
        );
        registry.broadcast(&ServerMessage::AddElement { element: decor }, Some(id));
        persist_player(state, id);
    }

    fn on_reset(&self, state: &mut GameState, id: &str) {
        let Some(player) = state.registry.player_mut(id) else {
            return;
        };
        player.reset_progression();
        let body = ProfileBody::from(&*player);

        state.registry.send_to(
            id,
            &ServerMessage::ResetResult {
                success: true,
                profile: body,
            },
        );
        persist_player(state, id);
    }

    #[cfg(test)]
    pub async fn state(&self) -> tokio::sync::MutexGuard<'_, GameState> {
        self.state.lock().await
    }
}

/// Project the player onto the store if a resume token is attached.
fn persist_player(state: &mut GameState, id: &str) {
    if let Some(player) = state.registry.player(id) {
        if let Some(token) = player.token.clone() {
            let profile = player.to_profile();
            state.store.upsert(&token, profile);
        }
    }
}

fn buy_failure(registry: &SessionRegistry, id: &str, reason: &str) {
    registry.send_to(
        id,
        &ServerMessage::BuyResult {
            ok: false,
            gold: None,
            inventory: None,
            reason: Some(reason.to_string()),
        },
    );
}

fn build_failure(registry: &SessionRegistry, id: &str, reason: &str) {
    registry.send_to(
        id,
        &ServerMessage::BuildResult {
            success: false,
            element: None,
            reason: Some(reason.to_string()),
        },
    );
}
