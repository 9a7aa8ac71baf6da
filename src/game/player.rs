//! Player State and Progression
//!
//! Live per-connection player state, the durable profile projection, and
//! the XP/level curve.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::catalog::{Rarity, STARTER_HOOK, STARTER_ROD};

/// Gold granted to a fresh character.
pub const STARTING_GOLD: u64 = 50;

/// Player name length cap.
pub const MAX_NAME_LEN: usize = 24;

/// Color palette cycled over join order.
const COLORS: [&str; 8] = [
    "#e6704b", "#4b9fe6", "#58c470", "#d8b13c", "#a66bd8", "#47c2b1", "#d85c8a", "#8a8f4a",
];

/// Pick a palette color for the nth connection.
pub fn pick_color(index: u64) -> String {
    COLORS[(index % COLORS.len() as u64) as usize].to_string()
}

/// Equipped gear ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Equipped rod id.
    pub rod: String,
    /// Equipped hook id.
    pub hook: String,
    /// No bait equipped is a valid state.
    pub bait: Option<String>,
}

impl Default for Equipment {
    fn default() -> Self {
        Self {
            rod: STARTER_ROD.to_string(),
            hook: STARTER_HOOK.to_string(),
            bait: None,
        }
    }
}

/// Owned items and material counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Owned rod ids.
    pub rods: Vec<String>,
    /// Owned hook ids.
    pub hooks: Vec<String>,
    /// Owned bait ids.
    pub baits: Vec<String>,
    /// Material id to count held.
    pub materials: BTreeMap<String, u32>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            rods: vec![STARTER_ROD.to_string()],
            hooks: vec![STARTER_HOOK.to_string()],
            baits: Vec::new(),
            materials: BTreeMap::new(),
        }
    }
}

impl Inventory {
    /// Whether an item id is owned in the given category slot.
    pub fn owns(&self, category: &str, id: &str) -> bool {
        match category {
            "rod" => self.rods.iter().any(|r| r == id),
            "hook" => self.hooks.iter().any(|h| h == id),
            "bait" => self.baits.iter().any(|b| b == id),
            _ => false,
        }
    }

    /// Add one unit of a material.
    pub fn add_material(&mut self, id: &str) {
        *self.materials.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Count of a material.
    pub fn material_count(&self, id: &str) -> u32 {
        self.materials.get(id).copied().unwrap_or(0)
    }
}

/// An uncommitted catch sitting in the bag until sold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BagItem {
    /// A caught fish.
    Fish {
        species: String,
        name: String,
        rarity: Rarity,
        weight: f64,
        price: u64,
    },
    /// A junk pull. Sells for scrap value.
    Junk { name: String, price: u64 },
}

impl BagItem {
    /// Sell price of the item.
    pub fn price(&self) -> u64 {
        match self {
            BagItem::Fish { price, .. } => *price,
            BagItem::Junk { price, .. } => *price,
        }
    }
}

/// The rarest fish a player has caught.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RarestFish {
    /// Display name of the fish.
    pub name: String,
    /// Its rarity tier.
    pub rarity: Rarity,
}

/// Cumulative lifetime stats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Total fish landed.
    pub fish_caught: u32,
    /// Sum of all landed weights (kg).
    pub total_weight: f64,
    /// Heaviest single catch (kg).
    pub best_weight: f64,
    /// Highest-tier catch so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarest_fish: Option<RarestFish>,
}

impl Stats {
    /// Record a landed fish.
    pub fn record_catch(&mut self, name: &str, rarity: Rarity, weight: f64) {
        self.fish_caught += 1;
        self.total_weight += weight;
        if weight > self.best_weight {
            self.best_weight = weight;
        }
        let is_rarer = self
            .rarest_fish
            .as_ref()
            .map(|r| rarity > r.rarity)
            .unwrap_or(true);
        if is_rarer {
            self.rarest_fish = Some(RarestFish {
                name: name.to_string(),
                rarity,
            });
        }
    }
}

/// Live state of one connected player.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Opaque process-unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Palette color assigned at connect.
    pub color: String,
    /// World-unit x position.
    pub x: f32,
    /// World-unit y position.
    pub y: f32,
    /// Facing direction ("up", "down", "left", "right").
    pub dir: String,
    /// Current level, starting at 1.
    pub level: u32,
    /// XP toward the next level.
    pub xp: f64,
    /// Gold on hand.
    pub gold: u64,
    /// Equipped gear.
    pub equipment: Equipment,
    /// Owned items and materials.
    pub inventory: Inventory,
    /// Unsold catches.
    pub bag: Vec<BagItem>,
    /// Resume token linking to the profile store, if presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Timestamp of the last processed move, for the speed clamp.
    #[serde(skip)]
    pub last_move_ms: Option<u64>,
    /// Lifetime catch stats.
    pub stats: Stats,
}

impl Player {
    /// Create a fresh player at the spawn point.
    pub fn new(id: String, spawn: (f32, f32), color: String) -> Self {
        Self {
            id,
            name: "Drifter".to_string(),
            color,
            x: spawn.0,
            y: spawn.1,
            dir: "down".to_string(),
            level: 1,
            xp: 0.0,
            gold: STARTING_GOLD,
            equipment: Equipment::default(),
            inventory: Inventory::default(),
            bag: Vec::new(),
            token: None,
            last_move_ms: None,
            stats: Stats::default(),
        }
    }

    /// XP needed to advance from `level` to the next one.
    pub fn xp_to_next(level: u32) -> f64 {
        80.0 + level as f64 * 40.0
    }

    /// Add XP, consuming level thresholds. Returns levels gained.
    pub fn grant_xp(&mut self, amount: f64) -> u32 {
        let mut gained = 0;
        self.xp += amount;
        while self.xp >= Self::xp_to_next(self.level) {
            self.xp -= Self::xp_to_next(self.level);
            self.level += 1;
            gained += 1;
        }
        gained
    }

    /// Restore progression defaults, keeping identity and position.
    pub fn reset_progression(&mut self) {
        self.level = 1;
        self.xp = 0.0;
        self.gold = STARTING_GOLD;
        self.equipment = Equipment::default();
        self.inventory = Inventory::default();
        self.bag.clear();
        self.stats = Stats::default();
    }

    /// Apply a stored profile onto this player.
    pub fn hydrate(&mut self, profile: &Profile) {
        self.name = profile.name.clone();
        self.color = profile.color.clone();
        self.level = profile.level;
        self.xp = profile.xp;
        self.gold = profile.gold;
        self.bag = profile.bag.clone();
        self.inventory = profile.inventory.clone();
        self.equipment = profile.equipment.clone();
        self.stats = profile.stats.clone();
    }

    /// Durable projection of this player.
    pub fn to_profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            color: self.color.clone(),
            level: self.level,
            xp: self.xp,
            gold: self.gold,
            bag: self.bag.clone(),
            inventory: self.inventory.clone(),
            equipment: self.equipment.clone(),
            stats: self.stats.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Persisted player progression, keyed by opaque token in the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Display name.
    pub name: String,
    /// Palette color.
    pub color: String,
    /// Current level.
    pub level: u32,
    /// XP toward the next level.
    pub xp: f64,
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
    /// Time of the last projection.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_player() -> Player {
        Player::new("p1".to_string(), (100.0, 200.0), pick_color(0))
    }

    #[test]
    fn test_new_player_defaults() {
        let player = test_player();
        assert_eq!(player.level, 1);
        assert_eq!(player.gold, STARTING_GOLD);
        assert_eq!(player.equipment.rod, STARTER_ROD);
        assert!(player.inventory.owns("rod", STARTER_ROD));
        assert!(player.inventory.owns("hook", STARTER_HOOK));
        assert!(player.bag.is_empty());
        assert!(player.last_move_ms.is_none());
    }

    #[test]
    fn test_grant_xp_levels_up() {
        let mut player = test_player();
        // Level 1 -> 2 requires 120 XP.
        assert_eq!(player.grant_xp(119.0), 0);
        assert_eq!(player.level, 1);
        assert_eq!(player.grant_xp(1.0), 1);
        assert_eq!(player.level, 2);
        assert!(player.xp.abs() < 1e-9);
    }

    #[test]
    fn test_grant_xp_multiple_levels() {
        let mut player = test_player();
        let gained = player.grant_xp(1000.0);
        assert!(gained >= 2);
        assert_eq!(player.level, 1 + gained);
    }

    #[test]
    fn test_stats_record_catch() {
        let mut stats = Stats::default();
        stats.record_catch("Lake Perch", Rarity::Common, 1.2);
        stats.record_catch("Amber Koi", Rarity::Rare, 0.9);
        stats.record_catch("Mud Carp", Rarity::Common, 2.0);

        assert_eq!(stats.fish_caught, 3);
        assert!((stats.total_weight - 4.1).abs() < 1e-9);
        assert!((stats.best_weight - 2.0).abs() < 1e-9);
        let rarest = stats.rarest_fish.unwrap();
        assert_eq!(rarest.rarity, Rarity::Rare);
        assert_eq!(rarest.name, "Amber Koi");
    }

    #[test]
    fn test_profile_round_trip() {
        let mut player = test_player();
        player.name = "Marlin".to_string();
        player.gold = 777;
        player.grant_xp(500.0);
        player.inventory.add_material("pearl");
        player.bag.push(BagItem::Junk {
            name: "Old Boot".to_string(),
            price: 2,
        });

        let profile = player.to_profile();
        let mut restored = test_player();
        restored.hydrate(&profile);

        assert_eq!(restored.name, player.name);
        assert_eq!(restored.gold, player.gold);
        assert_eq!(restored.level, player.level);
        assert_eq!(restored.bag, player.bag);
        assert_eq!(restored.inventory, player.inventory);
        assert_eq!(restored.equipment, player.equipment);
        assert_eq!(restored.stats, player.stats);
    }

    #[test]
    fn test_reset_progression() {
        let mut player = test_player();
        player.gold = 9999;
        player.grant_xp(5000.0);
        player.inventory.rods.push("tempest_rod".to_string());
        player.bag.push(BagItem::Junk {
            name: "Tin Can".to_string(),
            price: 1,
        });

        player.reset_progression();

        assert_eq!(player.level, 1);
        assert_eq!(player.gold, STARTING_GOLD);
        assert_eq!(player.inventory, Inventory::default());
        assert!(player.bag.is_empty());
    }

    #[test]
    fn test_pick_color_cycles() {
        assert_eq!(pick_color(0), pick_color(8));
        assert_ne!(pick_color(0), pick_color(1));
    }
}
