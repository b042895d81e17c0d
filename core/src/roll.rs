//! Stateless roll primitives shared by both path models and the route search.
//!
//! RULE: Every function here is total. Empty pools resolve to NO_ITEM,
//! never to a panic, and every modulo is guarded against a zero divisor.

use crate::types::{ItemId, Rarity, Seed, NO_ITEM, RATE_SCALE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Rarity thresholds ───────────────────────────────────────────────────────

/// Cumulative upper bounds of rarities 0..=3. Rarity 4 runs up to 9999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub bounds: [u32; 4],
}

impl Thresholds {
    pub fn from_rates(rates: &[u32; 5]) -> Self {
        let mut bounds = [0u32; 4];
        let mut acc = 0u32;
        for (bound, rate) in bounds.iter_mut().zip(rates.iter()) {
            acc = acc.saturating_add(*rate);
            *bound = acc;
        }
        Self { bounds }
    }

    /// Half-open `[lower, upper)` roll range that maps to `rarity`.
    /// Empty ranges come back with `lower == upper`.
    pub fn range_of(&self, rarity: Rarity) -> (u32, u32) {
        let i = rarity.index();
        let lower = if i == 0 { 0 } else { self.bounds[i - 1].min(RATE_SCALE) };
        let upper = if i == 4 { RATE_SCALE } else { self.bounds[i].min(RATE_SCALE) };
        (lower, upper.max(lower))
    }
}

/// Lowest rarity whose cumulative upper bound exceeds `roll`.
pub fn rarity_from_roll(roll: u32, thresholds: &Thresholds) -> Rarity {
    thresholds
        .bounds
        .iter()
        .position(|&bound| roll < bound)
        .map(|i| Rarity::ALL[i])
        .unwrap_or(Rarity::Legend)
}

// ── Slots and rerolls ───────────────────────────────────────────────────────

/// `pool[roll % len]`, or NO_ITEM for an empty pool.
pub fn slot_from_roll(roll: Seed, pool: &[ItemId]) -> ItemId {
    slot_index(roll, pool.len())
        .map(|slot| pool[slot])
        .unwrap_or(NO_ITEM)
}

pub fn slot_index(roll: Seed, pool_size: usize) -> Option<usize> {
    if pool_size == 0 {
        return None;
    }
    Some(roll as usize % pool_size)
}

/// Whether a Rare draw must be replaced by a different item of its pool.
pub fn is_duplicate_reroll(
    rarity: Rarity,
    pool_size: usize,
    current: ItemId,
    comparison: ItemId,
    force_all: bool,
) -> bool {
    rarity == Rarity::Rare && pool_size > 1 && (current == comparison || force_all)
}

/// The replacement picked by `roll` from `pool` minus `current`.
pub fn reroll_item(roll: Seed, pool: &[ItemId], current: ItemId) -> Option<ItemId> {
    let remaining: Vec<ItemId> = pool.iter().copied().filter(|&id| id != current).collect();
    slot_index(roll, remaining.len()).map(|slot| remaining[slot])
}

// ── Addresses ───────────────────────────────────────────────────────────────

/// Human-readable cell for a 1-based index: column letter then row number.
/// Index 1 with two columns is "A1", index 4 is "B2".
pub fn address_from_index(index: i64, columns: usize) -> String {
    if index <= 0 || columns == 0 {
        return String::new();
    }
    let zero_based = (index - 1) as u64;
    let columns = columns as u64;
    let column = (zero_based % columns) as u32;
    let row = zero_based / columns + 1;
    let letter = char::from_u32('A' as u32 + column).unwrap_or('?');
    format!("{letter}{row}")
}

// ── Pity counter ────────────────────────────────────────────────────────────

/// Draws remaining until the guaranteed draw. `None` disables pity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PityCounter {
    #[default]
    None,
    Remaining(u32),
}

impl PityCounter {
    /// The next draw is the guaranteed one.
    pub fn is_due(self) -> bool {
        self == PityCounter::Remaining(1)
    }

    /// Linear decrement after any draw; wraps to `cycle` instead of reaching 0.
    pub fn advance(self, cycle: u32) -> Self {
        match self {
            PityCounter::None => PityCounter::None,
            PityCounter::Remaining(n) => match n.saturating_sub(1) {
                0 => PityCounter::Remaining(cycle),
                next => PityCounter::Remaining(next),
            },
        }
    }

    pub fn advance_by(self, draws: u32, cycle: u32) -> Self {
        (0..draws).fold(self, |counter, _| counter.advance(cycle))
    }

    /// 0-based position of the guaranteed draw inside the next ten-draw block.
    pub fn position_in_block(self, block: usize) -> Option<usize> {
        match self {
            PityCounter::Remaining(n) if n >= 1 && (n as usize) <= block => Some(n as usize - 1),
            _ => None,
        }
    }
}

impl fmt::Display for PityCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PityCounter::None         => f.write_str("none"),
            PityCounter::Remaining(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for PityCounter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") || s.is_empty() {
            return Ok(PityCounter::None);
        }
        match s.parse::<u32>() {
            Ok(0)  => Err("pity counter must be at least 1".to_string()),
            Ok(n)  => Ok(PityCounter::Remaining(n)),
            Err(e) => Err(format!("invalid pity counter '{s}': {e}")),
        }
    }
}
