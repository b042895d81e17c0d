//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog item identifier. Negative values are sentinels, never catalog ids.
pub type ItemId = i32;

/// One 32-bit value of the pseudo-random stream.
pub type Seed = u32;

/// Resolved when a rarity's pool is empty (or nothing was drawn yet).
pub const NO_ITEM: ItemId = -1;

/// The promotional item of an uncompleted banner.
pub const FEATURED_ITEM: ItemId = -2;

/// Rolls are taken modulo this value before rarity and featured tests.
pub const RATE_SCALE: u32 = 10_000;

/// Placeholder name for items that cannot be resolved.
pub const UNKNOWN_ITEM_NAME: &str = "---";

/// Rarity tiers, in the order the rate table lists them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rarity {
    Normal    = 0,
    Rare      = 1,
    SuperRare = 2,
    Uber      = 3,
    Legend    = 4,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Normal,
        Rarity::Rare,
        Rarity::SuperRare,
        Rarity::Uber,
        Rarity::Legend,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal    => "normal",
            Self::Rare      => "rare",
            Self::SuperRare => "super_rare",
            Self::Uber      => "uber",
            Self::Legend    => "legend",
        }
    }
}

impl TryFrom<u8> for Rarity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rarity::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| format!("rarity must be 0..=4, got {value}"))
    }
}

impl From<Rarity> for u8 {
    fn from(r: Rarity) -> u8 {
        r as u8
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
