//! Item Catalog
//!
//! Static tuning tables for gear, materials, junk, species and buildable
//! elements. The catalog is constructed once and injected into the
//! message router so handlers never reach for global tables and tests
//! can substitute their own.

use serde::{Deserialize, Serialize};

use crate::world::tiles::Tile;

/// Catch rarity tier, ordered from most to least common.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Rarity {
    /// Baseline tier.
    Common = 0,
    /// Slightly better than common.
    Uncommon = 1,
    /// Rare tier.
    Rare = 2,
    /// Promotion ceiling for a good cast.
    Epic = 3,
    /// Top tier, only sampled directly.
    Legendary = 4,
}

impl Rarity {
    /// All tiers, index-aligned with `repr`.
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// Tier from index, clamped to the valid range.
    pub fn from_index_clamped(index: i32) -> Rarity {
        Self::ALL[index.clamp(0, 4) as usize]
    }

    /// Price multiplier applied to catches of this tier.
    pub fn price_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.6,
            Rarity::Rare => 2.8,
            Rarity::Epic => 5.0,
            Rarity::Legendary => 9.0,
        }
    }

    /// XP bonus scaled by score on a catch of this tier.
    pub fn xp_bonus(self) -> f64 {
        match self {
            Rarity::Common => 5.0,
            Rarity::Uncommon => 12.0,
            Rarity::Rare => 30.0,
            Rarity::Epic => 80.0,
            Rarity::Legendary => 200.0,
        }
    }
}

/// A fishing rod definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RodDef {
    /// Stable item id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Shop price in gold.
    pub cost: u64,
    /// Rod power feeds minigame difficulty and the weight formula.
    pub power: f64,
}

/// A hook definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HookDef {
    /// Stable item id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Shop price in gold.
    pub cost: u64,
    /// Multiplier on catch weight.
    pub weight_factor: f64,
}

/// A bait definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaitDef {
    /// Stable item id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Shop price in gold.
    pub cost: u64,
    /// Shifts rarity odds toward rarer tiers.
    pub rarity_bias: f64,
    /// Fractional reduction of the junk chance.
    pub junk_reduction: f64,
}

/// A craftable material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Stable material id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Base per-cast find chance at level 1.
    pub find_chance: f64,
    /// Gold value when sold.
    pub sell_value: u64,
}

/// A junk catch entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JunkDef {
    /// Display name.
    pub name: &'static str,
    /// Center of the scrap price.
    pub base_value: u64,
    /// Plus/minus spread on the price.
    pub variance: u64,
}

/// A catchable species.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    /// Stable species id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Rarity tier the species belongs to.
    pub rarity: Rarity,
    /// Lower bound of the natural weight range (kg).
    pub min_weight: f64,
    /// Upper bound of the natural weight range (kg).
    pub max_weight: f64,
    /// Price per kilogram before multipliers.
    pub base_price: f64,
}

/// Cost of one material for a buildable element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialCost {
    /// Material id consumed.
    pub material: &'static str,
    /// Units required.
    pub count: u32,
}

/// A buildable decorative element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildElementDef {
    /// Stable element id.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Gold consumed on placement.
    pub gold_cost: u64,
    /// Materials consumed on placement.
    pub materials: Vec<MaterialCost>,
}

/// The full static catalog.
#[derive(Clone, Debug)]
pub struct Catalog {
    /// Purchasable rods.
    pub rods: Vec<RodDef>,
    /// Purchasable hooks.
    pub hooks: Vec<HookDef>,
    /// Purchasable baits.
    pub baits: Vec<BaitDef>,
    /// Findable crafting materials.
    pub materials: Vec<MaterialDef>,
    /// Junk pull table.
    pub junk: Vec<JunkDef>,
    /// Species caught in lake water.
    pub water_species: Vec<Species>,
    /// Species pool for mountain terrain.
    pub mountain_species: Vec<Species>,
    /// Species pool for forest terrain.
    pub forest_species: Vec<Species>,
    /// Species pool for beach terrain.
    pub beach_species: Vec<Species>,
    /// Placeable build elements.
    pub build_elements: Vec<BuildElementDef>,
    /// Fixed generic fish used when a rarity pool is unexpectedly empty.
    pub fallback: Species,
}

/// Starting gear granted to fresh players.
pub const STARTER_ROD: &str = "driftwood_rod";
/// Starting hook granted to fresh players.
pub const STARTER_HOOK: &str = "rusty_hook";

impl Catalog {
    /// The standard production catalog.
    pub fn standard() -> Catalog {
        Catalog {
            rods: vec![
                RodDef { id: "driftwood_rod", name: "Driftwood Rod", cost: 0, power: 0.0 },
                RodDef { id: "willow_rod", name: "Willow Rod", cost: 250, power: 1.0 },
                RodDef { id: "carbon_rod", name: "Carbon Rod", cost: 900, power: 2.0 },
                RodDef { id: "tempest_rod", name: "Tempest Rod", cost: 2600, power: 3.0 },
            ],
            hooks: vec![
                HookDef { id: "rusty_hook", name: "Rusty Hook", cost: 0, weight_factor: 1.0 },
                HookDef { id: "barbed_hook", name: "Barbed Hook", cost: 180, weight_factor: 1.05 },
                HookDef { id: "gilded_hook", name: "Gilded Hook", cost: 700, weight_factor: 1.12 },
            ],
            baits: vec![
                BaitDef { id: "worm", name: "Worm", cost: 40, rarity_bias: 0.5, junk_reduction: 0.25 },
                BaitDef { id: "shrimp", name: "Shrimp", cost: 150, rarity_bias: 1.2, junk_reduction: 0.0 },
                BaitDef { id: "glowfly", name: "Glowfly", cost: 520, rarity_bias: 2.0, junk_reduction: 0.1 },
            ],
            materials: vec![
                MaterialDef { id: "driftwood", name: "Driftwood", find_chance: 0.030, sell_value: 6 },
                MaterialDef { id: "river_stone", name: "River Stone", find_chance: 0.020, sell_value: 9 },
                MaterialDef { id: "pearl", name: "Pearl", find_chance: 0.006, sell_value: 45 },
            ],
            junk: vec![
                JunkDef { name: "Old Boot", base_value: 2, variance: 2 },
                JunkDef { name: "Tin Can", base_value: 1, variance: 1 },
                JunkDef { name: "Seaweed Clump", base_value: 1, variance: 2 },
                JunkDef { name: "Snapped Line", base_value: 3, variance: 3 },
            ],
            water_species: vec![
                Species { id: "silver_sardine", name: "Silver Sardine", rarity: Rarity::Common, min_weight: 0.1, max_weight: 0.6, base_price: 3.0 },
                Species { id: "lake_perch", name: "Lake Perch", rarity: Rarity::Common, min_weight: 0.3, max_weight: 1.4, base_price: 4.0 },
                Species { id: "mud_carp", name: "Mud Carp", rarity: Rarity::Common, min_weight: 0.5, max_weight: 2.5, base_price: 3.5 },
                Species { id: "striped_bass", name: "Striped Bass", rarity: Rarity::Uncommon, min_weight: 0.8, max_weight: 4.0, base_price: 7.0 },
                Species { id: "whisker_catfish", name: "Whisker Catfish", rarity: Rarity::Uncommon, min_weight: 1.2, max_weight: 6.0, base_price: 8.0 },
                Species { id: "amber_koi", name: "Amber Koi", rarity: Rarity::Rare, min_weight: 1.0, max_weight: 5.0, base_price: 16.0 },
                Species { id: "ghost_sturgeon", name: "Ghost Sturgeon", rarity: Rarity::Rare, min_weight: 3.0, max_weight: 12.0, base_price: 18.0 },
                Species { id: "gilded_carp", name: "Gilded Carp", rarity: Rarity::Epic, min_weight: 2.0, max_weight: 9.0, base_price: 45.0 },
                Species { id: "abyss_leviathan", name: "Abyss Leviathan", rarity: Rarity::Legendary, min_weight: 10.0, max_weight: 40.0, base_price: 120.0 },
            ],
            mountain_species: vec![
                Species { id: "frost_trout", name: "Frost Trout", rarity: Rarity::Common, min_weight: 0.3, max_weight: 1.8, base_price: 5.0 },
                Species { id: "summit_char", name: "Summit Char", rarity: Rarity::Uncommon, min_weight: 0.6, max_weight: 3.0, base_price: 9.0 },
                Species { id: "glacier_pike", name: "Glacier Pike", rarity: Rarity::Rare, min_weight: 2.0, max_weight: 8.0, base_price: 20.0 },
            ],
            forest_species: vec![
                Species { id: "creek_minnow", name: "Creek Minnow", rarity: Rarity::Common, min_weight: 0.05, max_weight: 0.3, base_price: 2.0 },
                Species { id: "moss_eel", name: "Moss Eel", rarity: Rarity::Uncommon, min_weight: 0.5, max_weight: 2.8, base_price: 8.0 },
                Species { id: "elder_gar", name: "Elder Gar", rarity: Rarity::Rare, min_weight: 1.5, max_weight: 7.0, base_price: 17.0 },
            ],
            beach_species: vec![
                Species { id: "sand_dab", name: "Sand Dab", rarity: Rarity::Common, min_weight: 0.2, max_weight: 1.0, base_price: 3.0 },
                Species { id: "tide_flounder", name: "Tide Flounder", rarity: Rarity::Uncommon, min_weight: 0.7, max_weight: 3.5, base_price: 8.0 },
                Species { id: "moon_ray", name: "Moon Ray", rarity: Rarity::Rare, min_weight: 2.5, max_weight: 10.0, base_price: 19.0 },
            ],
            build_elements: vec![
                BuildElementDef {
                    id: "bench",
                    name: "Bench",
                    gold_cost: 60,
                    materials: vec![MaterialCost { material: "driftwood", count: 2 }],
                },
                BuildElementDef {
                    id: "lantern",
                    name: "Lantern",
                    gold_cost: 120,
                    materials: vec![MaterialCost { material: "river_stone", count: 1 }],
                },
                BuildElementDef {
                    id: "pier_post",
                    name: "Pier Post",
                    gold_cost: 200,
                    materials: vec![
                        MaterialCost { material: "driftwood", count: 3 },
                        MaterialCost { material: "river_stone", count: 1 },
                    ],
                },
            ],
            fallback: Species {
                id: "gray_smelt",
                name: "Gray Smelt",
                rarity: Rarity::Common,
                min_weight: 0.1,
                max_weight: 0.5,
                base_price: 1.0,
            },
        }
    }

    /// Look up a rod by id.
    pub fn rod(&self, id: &str) -> Option<&RodDef> {
        self.rods.iter().find(|r| r.id == id)
    }

    /// Look up a hook by id.
    pub fn hook(&self, id: &str) -> Option<&HookDef> {
        self.hooks.iter().find(|h| h.id == id)
    }

    /// Look up a bait by id.
    pub fn bait(&self, id: &str) -> Option<&BaitDef> {
        self.baits.iter().find(|b| b.id == id)
    }

    /// Look up a material by id.
    pub fn material(&self, id: &str) -> Option<&MaterialDef> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Look up a buildable element by id.
    pub fn build_element(&self, id: &str) -> Option<&BuildElementDef> {
        self.build_elements.iter().find(|e| e.id == id)
    }

    /// Species pool for a terrain type.
    ///
    /// Pools exist per terrain for future terrain-based selection, though
    /// resolution currently always draws from the water pool.
    pub fn species_pool(&self, terrain: Tile) -> &[Species] {
        match terrain {
            Tile::Mountain => &self.mountain_species,
            Tile::Forest => &self.forest_species,
            Tile::Beach => &self.beach_species,
            Tile::Water | Tile::Grass => &self.water_species,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_clamp() {
        assert_eq!(Rarity::from_index_clamped(-3), Rarity::Common);
        assert_eq!(Rarity::from_index_clamped(2), Rarity::Rare);
        assert_eq!(Rarity::from_index_clamped(9), Rarity::Legendary);
    }

    #[test]
    fn test_standard_catalog_lookups() {
        let catalog = Catalog::standard();
        assert!(catalog.rod(STARTER_ROD).is_some());
        assert!(catalog.hook(STARTER_HOOK).is_some());
        assert!(catalog.bait("worm").is_some());
        assert!(catalog.material("pearl").is_some());
        assert!(catalog.build_element("bench").is_some());
        assert!(catalog.rod("no_such_rod").is_none());
    }

    #[test]
    fn test_starter_gear_is_free() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.rod(STARTER_ROD).unwrap().cost, 0);
        assert_eq!(catalog.hook(STARTER_HOOK).unwrap().cost, 0);
    }

    #[test]
    fn test_species_weight_ranges_valid() {
        let catalog = Catalog::standard();
        for pool in [
            &catalog.water_species,
            &catalog.mountain_species,
            &catalog.forest_species,
            &catalog.beach_species,
        ] {
            for s in pool {
                assert!(s.min_weight > 0.0 && s.min_weight < s.max_weight, "{}", s.id);
            }
        }
    }

    #[test]
    fn test_water_pool_covers_every_tier() {
        let catalog = Catalog::standard();
        for tier in Rarity::ALL {
            assert!(
                catalog.water_species.iter().any(|s| s.rarity == tier),
                "no water species for {:?}",
                tier
            );
        }
    }

    #[test]
    fn test_build_element_materials_exist() {
        let catalog = Catalog::standard();
        for element in &catalog.build_elements {
            for cost in &element.materials {
                assert!(catalog.material(cost.material).is_some(), "{}", element.id);
            }
        }
    }
}
