//! Per-invocation parameters. Everything a run depends on is carried here
//! explicitly; there is no ambient "current banner" or reroll toggle.

use crate::{
    config::BannerConfig,
    draw::DrawState,
    error::{GachaError, GachaResult},
    roll::PityCounter,
    types::{ItemId, Seed, NO_ITEM},
};
use serde::{Deserialize, Serialize};

/// Row count of the default table view.
pub const DEFAULT_ROLLS: u32 = 100;

/// Node index every walk starts from.
pub const START_CURSOR: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    #[default]
    Auto,
    Completed,
    Uncompleted,
}

/// The model a request resolves to once `Auto` is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedMode {
    Completed,
    Uncompleted,
}

fn default_rolls() -> u32 {
    DEFAULT_ROLLS
}

fn default_last_item() -> ItemId {
    NO_ITEM
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub banner_id:          String,
    pub seed:               Seed,
    #[serde(default = "default_rolls")]
    pub rolls:              u32,
    #[serde(default)]
    pub pity:               PityCounter,
    /// Featured stock left; `None` uses the banner's initial stock.
    #[serde(default)]
    pub featured_stock:     Option<u32>,
    #[serde(default = "default_last_item")]
    pub last_item:          ItemId,
    #[serde(default)]
    pub force_rare_rerolls: bool,
    #[serde(default)]
    pub mode:               ModelMode,
}

impl SimulationRequest {
    pub fn new(banner_id: impl Into<String>, seed: Seed) -> Self {
        Self {
            banner_id:          banner_id.into(),
            seed,
            rolls:              DEFAULT_ROLLS,
            pity:               PityCounter::None,
            featured_stock:     None,
            last_item:          NO_ITEM,
            force_rare_rerolls: false,
            mode:               ModelMode::Auto,
        }
    }

    pub fn with_rolls(mut self, rolls: u32) -> Self {
        self.rolls = rolls;
        self
    }

    pub fn with_pity(mut self, pity: PityCounter) -> Self {
        self.pity = pity;
        self
    }

    pub fn with_featured_stock(mut self, stock: u32) -> Self {
        self.featured_stock = Some(stock);
        self
    }

    pub fn with_last_item(mut self, item: ItemId) -> Self {
        self.last_item = item;
        self
    }

    pub fn with_forced_rerolls(mut self, force: bool) -> Self {
        self.force_rare_rerolls = force;
        self
    }

    pub fn with_mode(mut self, mode: ModelMode) -> Self {
        self.mode = mode;
        self
    }

    /// The pity counter must lie in `1..=cycle` when set.
    pub fn validate(&self, banner: &BannerConfig) -> GachaResult<()> {
        if let PityCounter::Remaining(value) = self.pity {
            let cycle = banner.guaranteed_cycle;
            if value == 0 || value > cycle {
                return Err(GachaError::InvalidPity { value, cycle });
            }
        }
        Ok(())
    }

    pub fn initial_state(&self) -> DrawState {
        DrawState {
            cursor:    START_CURSOR,
            last_item: self.last_item,
            pity:      self.pity,
        }
    }

    pub fn stock(&self, banner: &BannerConfig) -> u32 {
        self.featured_stock.unwrap_or(banner.featured_item_stock)
    }

    pub fn resolve_mode(&self, banner: &BannerConfig) -> ResolvedMode {
        match self.mode {
            ModelMode::Completed => ResolvedMode::Completed,
            ModelMode::Uncompleted => ResolvedMode::Uncompleted,
            ModelMode::Auto if banner.has_featured_mechanic() && self.stock(banner) > 0 => {
                ResolvedMode::Uncompleted
            }
            ModelMode::Auto => ResolvedMode::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(flatten)]
    pub simulation:    SimulationRequest,
    pub tickets:       usize,
    #[serde(default)]
    pub target_layers: Vec<Vec<ItemId>>,
    #[serde(default)]
    pub beam_width:    Option<usize>,
}

impl RouteRequest {
    pub fn new(simulation: SimulationRequest, tickets: usize) -> Self {
        Self {
            simulation,
            tickets,
            target_layers: Vec::new(),
            beam_width: None,
        }
    }

    pub fn with_target_layer(mut self, layer: Vec<ItemId>) -> Self {
        self.target_layers.push(layer);
        self
    }

    pub fn with_beam_width(mut self, width: usize) -> Self {
        self.beam_width = Some(width);
        self
    }
}
