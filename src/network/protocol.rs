//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! One JSON message per frame, discriminated by a `type` field.

use serde::{Deserialize, Serialize};

use crate::game::catalog::Rarity;
use crate::game::fishing::{CatchReport, MinigameParams};
use crate::game::player::{BagItem, Equipment, Inventory, Player, Stats};
use crate::world::tiles::{Decor, WorldSummary};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Attach a persistence token and hydrate the stored profile.
    Resume { token: String },

    /// Proposed movement.
    Move { x: f32, y: f32, dir: String },

    /// Begin the fishing minigame.
    StartFishing {},

    /// Minigame outcome report.
    FishingResult {
        score: f64,
        perfects: u32,
        cast_power: f64,
    },

    /// Sell the entire bag.
    SellAll {},

    /// Purchase an item from a shop category.
    BuyItem { category: String, item_id: String },

    /// Change equipped gear; absent slots are untouched.
    Equip {
        #[serde(default)]
        rod: Option<String>,
        #[serde(default)]
        hook: Option<String>,
        #[serde(default)]
        bait: Option<String>,
    },

    /// Rename the character.
    SetName { name: String },

    /// Chat line.
    Chat { text: String },

    /// Place a buildable element in the world.
    BuildElement { element_id: String, x: f32, y: f32 },

    /// Wipe progression back to defaults.
    ResetCharacter {},
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Public view of another player (no inventory or token).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    /// Player id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Palette color.
    pub color: String,
    /// World-unit x position.
    pub x: f32,
    /// World-unit y position.
    pub y: f32,
    /// Facing direction.
    pub dir: String,
    /// Current level.
    pub level: u32,
}

impl From<&Player> for PlayerPublic {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            color: p.color.clone(),
            x: p.x,
            y: p.y,
            dir: p.dir.clone(),
            level: p.level,
        }
    }
}

/// One scoreboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardEntry {
    /// Player id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current level.
    pub level: u32,
    /// Total fish landed.
    pub fish_count: u32,
    /// Heaviest single catch (kg).
    pub best_weight: f64,
    /// Highest rarity tier caught.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarest: Option<Rarity>,
}

/// Profile snapshot pushed after state-changing actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    /// Gold on hand.
    pub gold: u64,
    /// Unsold catches.
    pub bag: Vec<BagItem>,
    /// Owned items and materials.
    pub inventory: Inventory,
    /// Equipped gear.
    pub equipment: Equipment,
    /// Lifetime catch stats.
    pub stats: Stats,
}

impl From<&Player> for ProfileBody {
    fn from(p: &Player) -> Self {
        Self {
            gold: p.gold,
            bag: p.bag.clone(),
            inventory: p.inventory.clone(),
            equipment: p.equipment.clone(),
            stats: p.stats.clone(),
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Connection snapshot: self, world, peers, scoreboard.
    Init {
        you: Box<Player>,
        map: Box<WorldSummary>,
        players: Vec<PlayerPublic>,
        scoreboard: Vec<ScoreboardEntry>,
    },

    /// Another player connected.
    Join { player: PlayerPublic },

    /// A player disconnected.
    Leave { id: String },

    /// Movement broadcast.
    State { id: String, x: f32, y: f32, dir: String },

    /// Movement correction, sent to the moving client only.
    Corr { id: String, x: f32, y: f32, dir: String },

    /// A fishing session began.
    FishingStart {
        fish_id: String,
        time_limit_ms: u64,
        cast_time_ms: u64,
        minigame: MinigameParams,
    },

    /// Cast refused (cooldown or active session).
    FishingDenied {},

    /// Direct resolution reply to the caster.
    FishResult {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        catch: Option<CatchReport>,
        #[serde(skip_serializing_if = "Option::is_none")]
        xp_gain: Option<f64>,
    },

    /// Broadcast of a landed catch.
    FishEvent {
        id: String,
        name: String,
        catch: CatchReport,
        scoreboard: Vec<ScoreboardEntry>,
    },

    /// Broadcast of a level-up.
    LevelUp { id: String, level: u32 },

    /// Authoritative profile refresh for the owning client.
    Profile(ProfileBody),

    /// Bag sale result.
    SellResult {
        ok: bool,
        earned: u64,
        gold: u64,
        sold: u32,
    },

    /// Purchase result.
    BuyResult {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        gold: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        inventory: Option<Inventory>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Equipment change result.
    EquipAck {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        equipment: Option<Equipment>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Rename confirmation to the sender.
    NameAck { id: String, name: String },

    /// Rename broadcast to everyone else.
    Rename { id: String, name: String },

    /// Chat broadcast.
    Chat { id: String, name: String, text: String },

    /// Build attempt result for the sender.
    BuildResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        element: Option<Decor>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// New world element broadcast.
    AddElement { element: Decor },

    /// Character reset result.
    ResetResult { success: bool, profile: ProfileBody },

    /// Scoreboard refresh.
    Scoreboard { scoreboard: Vec<ScoreboardEntry> },

    /// Connection rejected at capacity.
    Full { msg: String },
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
