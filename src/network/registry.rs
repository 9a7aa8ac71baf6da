//! Session Registry
//!
//! Owns everything keyed by connection: live players, outbound frame
//! senders, in-flight fishing sessions and cast cooldowns. All maps are
//! kept in lockstep so a disconnect tears down every trace of a player
//! in one call.
//!
//! Frames are serialized once per broadcast and fanned out; a send to a
//! closing connection is dropped silently and cleaned up on disconnect.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::game::fishing::FishingSession;
use crate::game::player::{pick_color, Player};
use crate::network::protocol::{PlayerPublic, ScoreboardEntry, ServerMessage};

/// Default connection cap.
pub const DEFAULT_PLAYER_CAP: usize = 64;

/// Outbound channel carrying pre-serialized frames to one writer task.
pub type Outbound = UnboundedSender<String>;

/// Per-connection state for the whole server.
pub struct SessionRegistry {
    capacity: usize,
    /// Lifetime join counter, drives the color palette.
    joined_total: u64,
    players: HashMap<String, Player>,
    senders: HashMap<String, Outbound>,
    sessions: HashMap<String, FishingSession>,
    last_cast: HashMap<String, u64>,
}

impl SessionRegistry {
    /// Empty registry with a fixed connection cap.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            joined_total: 0,
            players: HashMap::new(),
            senders: HashMap::new(),
            sessions: HashMap::new(),
            last_cast: HashMap::new(),
        }
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players are connected.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether the server is at capacity.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity
    }

    /// Register a new connection at the spawn point.
    ///
    /// Returns the new player id, or `None` at capacity.
    pub fn connect(&mut self, spawn: (f32, f32), sender: Outbound) -> Option<String> {
        if self.is_full() {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        let player = Player::new(id.clone(), spawn, pick_color(self.joined_total));
        self.joined_total += 1;
        self.players.insert(id.clone(), player);
        self.senders.insert(id.clone(), sender);
        debug!(player = %id, online = self.players.len(), "player connected");
        Some(id)
    }

    /// Remove a connection and all of its per-player state.
    pub fn disconnect(&mut self, id: &str) -> Option<Player> {
        self.senders.remove(id);
        self.sessions.remove(id);
        self.last_cast.remove(id);
        let player = self.players.remove(id);
        if player.is_some() {
            debug!(player = %id, online = self.players.len(), "player disconnected");
        }
        player
    }

    /// Connected player by id.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Mutable access to a connected player.
    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Public views of every player except one.
    pub fn players_except(&self, except: &str) -> Vec<PlayerPublic> {
        self.players
            .values()
            .filter(|p| p.id != except)
            .map(PlayerPublic::from)
            .collect()
    }

    /// Scoreboard rows sorted by fish caught, then best weight.
    pub fn scoreboard(&self) -> Vec<ScoreboardEntry> {
        let mut rows: Vec<ScoreboardEntry> = self
            .players
            .values()
            .map(|p| ScoreboardEntry {
                id: p.id.clone(),
                name: p.name.clone(),
                level: p.level,
                fish_count: p.stats.fish_caught,
                best_weight: p.stats.best_weight,
                rarest: p.stats.rarest_fish.as_ref().map(|r| r.rarity),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.fish_count
                .cmp(&a.fish_count)
                .then(b.best_weight.total_cmp(&a.best_weight))
        });
        rows
    }

    /// Send one message to one player.
    pub fn send_to(&self, id: &str, msg: &ServerMessage) {
        let frame = match msg.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "outbound frame serialization failed");
                return;
            }
        };
        if let Some(sender) = self.senders.get(id) {
            let _ = sender.send(frame);
        }
    }

    /// Broadcast one message, optionally skipping a player.
    ///
    /// The frame is serialized once; closed channels are skipped.
    pub fn broadcast(&self, msg: &ServerMessage, except: Option<&str>) {
        let frame = match msg.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "broadcast frame serialization failed");
                return;
            }
        };
        for (id, sender) in &self.senders {
            if Some(id.as_str()) == except {
                continue;
            }
            let _ = sender.send(frame.clone());
        }
    }

    /// Whether the player has an unresolved fishing session.
    pub fn has_session(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// The player's active session, if any.
    pub fn session(&self, id: &str) -> Option<&FishingSession> {
        self.sessions.get(id)
    }

    /// Store the active session for a player.
    pub fn insert_session(&mut self, id: &str, session: FishingSession) {
        self.sessions.insert(id.to_string(), session);
    }

    /// Remove and return the active session. Resolution is single-use.
    pub fn take_session(&mut self, id: &str) -> Option<FishingSession> {
        self.sessions.remove(id)
    }

    /// Timestamp of the player's last accepted cast.
    pub fn last_cast_ms(&self, id: &str) -> Option<u64> {
        self.last_cast.get(id).copied()
    }

    /// Record an accepted cast for the cooldown window.
    pub fn set_last_cast(&mut self, id: &str, now_ms: u64) {
        self.last_cast.insert(id.to_string(), now_ms);
    }
}
