//! Master data: the item catalog and per-banner configuration.
//!
//! RULE: Configuration defects never abort a simulation. A rate table that
//! does not sum to 10000 or a rarity with a rate but no items is recorded as
//! a diagnostic and degrades to NO_ITEM draws at simulation time.

use crate::{
    error::{GachaError, GachaResult},
    roll::Thresholds,
    types::{ItemId, Rarity, FEATURED_ITEM, NO_ITEM, RATE_SCALE, UNKNOWN_ITEM_NAME},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Pity period used when a banner declares a cycle of 0.
pub const DEFAULT_GUARANTEED_CYCLE: u32 = 10;

// ── Item catalog ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    pub id:     ItemId,
    pub name:   String,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<ItemId, ItemRecord>,
}

impl ItemCatalog {
    pub fn new(records: impl IntoIterator<Item = ItemRecord>) -> Self {
        Self {
            items: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemRecord> {
        self.items.get(&id)
    }

    pub fn rarity_of(&self, id: ItemId) -> Option<Rarity> {
        self.get(id).map(|r| r.rarity)
    }

    /// Display name, or the `---` placeholder for sentinels and unknown ids.
    pub fn name_of(&self, id: ItemId) -> &str {
        match id {
            FEATURED_ITEM => "Featured",
            NO_ITEM       => UNKNOWN_ITEM_NAME,
            _ => self.get(id).map(|r| r.name.as_str()).unwrap_or(UNKNOWN_ITEM_NAME),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ── Banners ─────────────────────────────────────────────────────────────────

/// A banner as it appears in master data, before pools are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerRecord {
    pub id:                  String,
    pub name:                String,
    #[serde(default)]
    pub featured_item_rate:  u32,
    #[serde(default)]
    pub featured_item_stock: u32,
    pub guaranteed_cycle:    u32,
    #[serde(default)]
    pub uber_guaranteed:     bool,
    #[serde(default)]
    pub legend_guaranteed:   bool,
    pub rarity_rates:        [u32; 5],
    pub pool:                Vec<ItemId>,
}

/// Immutable banner configuration with its per-rarity pools derived once.
#[derive(Debug, Clone)]
pub struct BannerConfig {
    pub id:                  String,
    pub name:                String,
    pub featured_item_rate:  u32,
    pub featured_item_stock: u32,
    pub guaranteed_cycle:    u32,
    pub uber_guaranteed:     bool,
    pub legend_guaranteed:   bool,
    pub rarity_rates:        [u32; 5],
    pub pool:                Vec<ItemId>,
    rarity_items:            [Vec<ItemId>; 5],
    thresholds:              Thresholds,
    diagnostics:             Vec<String>,
}

impl BannerConfig {
    /// Split `pool` by catalog rarity, preserving pool order (slot order).
    pub fn new(record: BannerRecord, catalog: &ItemCatalog) -> Self {
        let mut diagnostics = Vec::new();
        let mut rarity_items: [Vec<ItemId>; 5] = Default::default();

        for &id in &record.pool {
            match catalog.rarity_of(id) {
                Some(rarity) => rarity_items[rarity.index()].push(id),
                None => diagnostics.push(format!("pool item {id} is not in the item catalog")),
            }
        }

        let mut seen = BTreeSet::new();
        let duplicates: BTreeSet<ItemId> =
            record.pool.iter().copied().filter(|&id| !seen.insert(id)).collect();
        for id in duplicates {
            diagnostics.push(format!("pool contains duplicate id {id}"));
        }

        let total: u64 = record.rarity_rates.iter().map(|&r| r as u64).sum();
        if total != RATE_SCALE as u64 {
            diagnostics.push(format!("rarity rates sum to {total}, expected {RATE_SCALE}"));
        }
        for rarity in Rarity::ALL {
            if record.rarity_rates[rarity.index()] > 0 && rarity_items[rarity.index()].is_empty() {
                diagnostics.push(format!("{rarity} has a nonzero rate but an empty pool"));
            }
        }

        let guaranteed_cycle = if record.guaranteed_cycle == 0 {
            diagnostics.push(format!(
                "guaranteed cycle of 0 replaced by {DEFAULT_GUARANTEED_CYCLE}"
            ));
            DEFAULT_GUARANTEED_CYCLE
        } else {
            record.guaranteed_cycle
        };

        for issue in &diagnostics {
            log::warn!("banner {}: {issue}", record.id);
        }

        Self {
            thresholds: Thresholds::from_rates(&record.rarity_rates),
            id: record.id,
            name: record.name,
            featured_item_rate: record.featured_item_rate,
            featured_item_stock: record.featured_item_stock,
            guaranteed_cycle,
            uber_guaranteed: record.uber_guaranteed,
            legend_guaranteed: record.legend_guaranteed,
            rarity_rates: record.rarity_rates,
            pool: record.pool,
            rarity_items,
            diagnostics,
        }
    }

    pub fn pool_for(&self, rarity: Rarity) -> &[ItemId] {
        &self.rarity_items[rarity.index()]
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Weights of Uber and Legend in a guaranteed draw; a rarity the pity
    /// mechanic cannot produce weighs 0.
    pub fn guaranteed_weights(&self) -> (u32, u32) {
        let uber = if self.uber_guaranteed { self.rarity_rates[Rarity::Uber.index()] } else { 0 };
        let legend = if self.legend_guaranteed { self.rarity_rates[Rarity::Legend.index()] } else { 0 };
        (uber, legend)
    }

    pub fn guaranteed_divisor(&self) -> u32 {
        let (uber, legend) = self.guaranteed_weights();
        uber.saturating_add(legend)
    }

    pub fn has_featured_mechanic(&self) -> bool {
        self.featured_item_rate > 0 && self.featured_item_stock > 0
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

// ── Master data ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct ItemsFile {
    items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct BannersFile {
    banners: Vec<BannerRecord>,
}

#[derive(Debug, Clone)]
pub struct MasterData {
    pub catalog: ItemCatalog,
    banners:     BTreeMap<String, BannerConfig>,
}

impl MasterData {
    pub fn from_records(items: Vec<ItemRecord>, banners: Vec<BannerRecord>) -> Self {
        let catalog = ItemCatalog::new(items);
        let banners = banners
            .into_iter()
            .map(|b| (b.id.clone(), BannerConfig::new(b, &catalog)))
            .collect();
        Self { catalog, banners }
    }

    /// Load from the data/ directory.
    /// In tests, use MasterData::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let items_path = format!("{data_dir}/items.json");
        let items_content = std::fs::read_to_string(&items_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {items_path}: {e}"))?;
        let items_file: ItemsFile = serde_json::from_str(&items_content)?;

        let banners_path = format!("{data_dir}/banners.json");
        let banners_content = std::fs::read_to_string(&banners_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {banners_path}: {e}"))?;
        let banners_file: BannersFile = serde_json::from_str(&banners_content)?;

        let master = Self::from_records(items_file.items, banners_file.banners);
        log::debug!(
            "master data loaded from {data_dir}: {} items, {} banners",
            master.catalog.len(),
            master.banners.len()
        );
        Ok(master)
    }

    pub fn banner(&self, id: &str) -> GachaResult<&BannerConfig> {
        self.banners
            .get(id)
            .ok_or_else(|| GachaError::BannerNotFound { id: id.to_string() })
    }

    pub fn banners(&self) -> impl Iterator<Item = &BannerConfig> {
        self.banners.values()
    }

    /// The banner with the highest numeric id; the runner's default.
    pub fn latest_banner_id(&self) -> Option<&str> {
        self.banners
            .keys()
            .map(String::as_str)
            .max_by_key(|id| (id.parse::<u64>().ok(), *id))
    }

    /// Built-in master data with hardcoded banners for use in tests.
    pub fn default_test() -> Self {
        let item = |id: ItemId, name: &str, rarity: Rarity| ItemRecord {
            id,
            name: name.into(),
            rarity,
        };
        let items = vec![
            item(0,   "Speed Up",        Rarity::Rare),
            item(2,   "Rich Cat",        Rarity::SuperRare),
            item(3,   "Cat CPU",         Rarity::Rare),
            item(4,   "Cat Jobs",        Rarity::SuperRare),
            item(5,   "Sniper the Cat",  Rarity::SuperRare),
            item(10,  "5K XP",           Rarity::Normal),
            item(11,  "10K XP",          Rarity::Rare),
            item(12,  "30K XP",          Rarity::Rare),
            item(14,  "100K XP",         Rarity::SuperRare),
            item(18,  "2M XP",           Rarity::Legend),
            item(197, "1M XP",           Rarity::Legend),
            item(184, "Mr. Ninja",       Rarity::Uber),
            item(202, "Dumpling Cat",    Rarity::Uber),
            item(375, "Anniversary Cat", Rarity::Uber),
            item(381, "Farmer Cat",      Rarity::Uber),
            item(646, "Firecracker Cat", Rarity::Uber),
            item(689, "Ten-Year Cat",    Rarity::Uber),
            item(726, "Medal King Cat",  Rarity::Uber),
            item(730, "Ancient Egg",     Rarity::Uber),
            item(831, "Scarf Cat",       Rarity::Uber),
        ];

        let banner = |id: &str,
                      name: &str,
                      featured: (u32, u32),
                      cycle: u32,
                      guaranteed: (bool, bool),
                      rates: [u32; 5],
                      pool: &[ItemId]| BannerRecord {
            id: id.into(),
            name: name.into(),
            featured_item_rate: featured.0,
            featured_item_stock: featured.1,
            guaranteed_cycle: cycle,
            uber_guaranteed: guaranteed.0,
            legend_guaranteed: guaranteed.1,
            rarity_rates: rates,
            pool: pool.to_vec(),
        };
        let banners = vec![
            banner("34", "Halloween (legacy)", (600, 5), 30, (false, false),
                [2000, 5000, 3000, 0, 0],
                &[0, 2, 3, 4, 5, 10, 11, 12, 14]),
            banner("42", "110M Downloads", (500, 5), 30, (false, false),
                [1000, 5000, 3000, 1000, 0],
                &[0, 2, 3, 4, 5, 10, 11, 12, 14, 375, 381, 689]),
            banner("44", "Halloween", (500, 8), 30, (false, false),
                [2000, 4900, 3000, 0, 100],
                &[0, 2, 3, 4, 5, 10, 11, 12, 14, 18]),
            banner("45", "Nyanko Rangers", (0, 0), 10, (true, false),
                [0, 7000, 2300, 500, 200],
                &[0, 2, 3, 4, 5, 11, 12, 14, 197, 184, 375, 726, 831]),
            banner("46", "Lunar New Year", (0, 0), 10, (true, false),
                [800, 5000, 3000, 1000, 200],
                &[10, 0, 3, 11, 12, 2, 4, 5, 14, 730, 646, 202, 197]),
        ];

        Self::from_records(items, banners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_keep_master_order() {
        let master = MasterData::default_test();
        let banner = master.banner("46").unwrap();
        assert_eq!(banner.pool_for(Rarity::Rare), &[0, 3, 11, 12]);
        assert_eq!(banner.pool_for(Rarity::Uber), &[730, 646, 202]);
        assert_eq!(banner.pool_for(Rarity::Normal), &[10]);
    }

    #[test]
    fn built_in_banners_are_clean() {
        let master = MasterData::default_test();
        for banner in master.banners() {
            assert!(
                banner.diagnostics().is_empty(),
                "banner {} reported {:?}",
                banner.id,
                banner.diagnostics()
            );
        }
    }

    #[test]
    fn duplicate_pool_ids_are_reported_once() {
        let master = MasterData::default_test();
        let mut record = BannerRecord {
            id: "dup".into(),
            name: "dup".into(),
            featured_item_rate: 0,
            featured_item_stock: 0,
            guaranteed_cycle: 10,
            uber_guaranteed: false,
            legend_guaranteed: false,
            rarity_rates: [0, 8000, 2000, 0, 0],
            pool: vec![11, 11, 11, 2],
        };
        let banner = BannerConfig::new(record.clone(), &master.catalog);
        assert_eq!(banner.diagnostics(), &["pool contains duplicate id 11".to_string()]);
        assert_eq!(banner.pool_for(Rarity::Rare), &[11, 11, 11]);

        record.pool = vec![11, 12, 2];
        assert!(BannerConfig::new(record, &master.catalog).diagnostics().is_empty());
    }

    #[test]
    fn latest_banner_is_highest_numeric_id() {
        assert_eq!(MasterData::default_test().latest_banner_id(), Some("46"));
    }
}
