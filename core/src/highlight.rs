//! Address → annotation map of the cells touched by the walked routes.

use crate::draw::{ResolvedDraw, RollRecord, TenDraw};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellMark {
    /// Roll number of the single-draw route that lands here.
    pub single_roll:   Option<u32>,
    /// Roll number (1-based across blocks) of the ten-draw route that lands here.
    pub ten_roll:      Option<u32>,
    pub single_pity:   bool,
    pub ten_pity:      bool,
    pub single_reroll: bool,
    pub ten_reroll:    bool,
    pub featured:      bool,
    /// Cell consumed by a ten-draw block's up-front pity rarity decision.
    pub pity_head:     bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteHighlight {
    cells: BTreeMap<String, CellMark>,
}

impl RouteHighlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight for the single and ten-draw routes of one simulation.
    pub fn from_routes(
        singles: &[RollRecord],
        tens: &[TenDraw],
        head_address: impl Fn(usize) -> String,
    ) -> Self {
        let mut highlight = Self::new();
        highlight.mark_singles(singles);
        highlight.mark_tens(tens, head_address);
        highlight
    }

    pub fn mark_singles(&mut self, records: &[RollRecord]) {
        for record in records {
            let draw = &record.draw;
            let cell = self.cell(&draw.address);
            cell.single_roll.get_or_insert(record.roll);
            cell.single_pity |= draw.is_pity();
            cell.single_reroll |= draw.reroll;
            cell.featured |= draw.is_featured();
        }
    }

    /// `head_address` renders the stream index a block spent on its pity
    /// rarity decision.
    pub fn mark_tens(&mut self, blocks: &[TenDraw], head_address: impl Fn(usize) -> String) {
        let mut roll = 0u32;
        for block in blocks {
            if let Some(head) = block.pity_head {
                self.cell(&head_address(head)).pity_head = true;
            }
            for draw in &block.draws {
                roll += 1;
                self.mark_ten_draw(draw, roll);
            }
        }
    }

    fn mark_ten_draw(&mut self, draw: &ResolvedDraw, roll: u32) {
        let cell = self.cell(&draw.address);
        cell.ten_roll.get_or_insert(roll);
        cell.ten_pity |= draw.is_pity();
        cell.ten_reroll |= draw.reroll;
        cell.featured |= draw.is_featured();
    }

    fn cell(&mut self, address: &str) -> &mut CellMark {
        self.cells.entry(address.to_string()).or_default()
    }

    pub fn get(&self, address: &str) -> Option<&CellMark> {
        self.cells.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellMark)> {
        self.cells.iter().map(|(address, mark)| (address.as_str(), mark))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
