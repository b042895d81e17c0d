//! The common draw capability shared by both roll-topology models.
//!
//! RULE: A model only decides what one draw (or one ten-draw block) yields
//! from a given position and how far it moves the stream cursor. The pity
//! update, the "last item" hand-off and the walking loop live here, once,
//! so the two models cannot drift apart on them.

use crate::{
    roll::PityCounter,
    types::{ItemId, Rarity},
};
use serde::{Deserialize, Serialize};

/// Draws per ten-draw block.
pub const TEN_DRAW_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawKind {
    Ordinary,
    Pity,
    Featured,
}

/// Where a path walker stands between draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawState {
    /// 1-based node (stream) index the next draw starts at.
    pub cursor:    usize,
    pub last_item: ItemId,
    pub pity:      PityCounter,
}

/// The outcome of one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDraw {
    pub kind:       DrawKind,
    pub item:       ItemId,
    /// `None` when nothing from the rarity table was obtained.
    pub rarity:     Option<Rarity>,
    pub reroll:     bool,
    /// Stream index the draw's resolution is anchored at.
    pub node_index: usize,
    pub address:    String,
    /// Stream values (completed model: nodes) this draw consumed.
    pub cost:       usize,
}

impl ResolvedDraw {
    pub fn is_pity(&self) -> bool {
        self.kind == DrawKind::Pity
    }

    pub fn is_featured(&self) -> bool {
        self.kind == DrawKind::Featured
    }
}

/// One numbered draw along a walked path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRecord {
    pub roll: u32,
    #[serde(flatten)]
    pub draw: ResolvedDraw,
}

/// A resolved ten-draw block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenDraw {
    pub start: DrawState,
    pub draws: Vec<ResolvedDraw>,
    pub next:  DrawState,
    /// Stream index spent on the block's up-front pity rarity decision.
    pub pity_head: Option<usize>,
}

impl TenDraw {
    pub fn cost(&self) -> usize {
        self.next.cursor - self.start.cursor
    }

    pub fn pity_position(&self) -> Option<usize> {
        self.draws.iter().position(ResolvedDraw::is_pity)
    }
}

/// A roll topology: resolves draws from an arbitrary cursor and pity state.
pub trait DrawModel {
    fn guaranteed_cycle(&self) -> u32;

    /// Human-readable cell of a 1-based stream/node index.
    fn address_of(&self, index: usize) -> String;

    /// `None` when the draw would read past the generated table.
    fn resolve_single(&self, state: &DrawState) -> Option<ResolvedDraw>;

    fn resolve_ten(&self, state: &DrawState) -> Option<TenDraw>;

    /// Resolve one draw and hand back the state after it.
    fn step_single(&self, state: &DrawState) -> Option<(ResolvedDraw, DrawState)> {
        let draw = self.resolve_single(state)?;
        let next = DrawState {
            cursor:    state.cursor + draw.cost,
            last_item: draw.item,
            pity:      state.pity.advance(self.guaranteed_cycle()),
        };
        Some((draw, next))
    }
}

/// Walk `rolls` single draws from `start`, stopping early at the table's end.
pub fn walk_singles<M: DrawModel + ?Sized>(model: &M, start: DrawState, rolls: u32) -> Vec<RollRecord> {
    let mut records = Vec::with_capacity(rolls as usize);
    let mut state = start;
    for roll in 1..=rolls {
        let Some((draw, next)) = model.step_single(&state) else {
            break;
        };
        records.push(RollRecord { roll, draw });
        state = next;
    }
    records
}

/// State after `rolls` single draws, or `None` if the table ends first.
pub fn state_after_singles<M: DrawModel + ?Sized>(model: &M, start: DrawState, rolls: u32) -> Option<DrawState> {
    (0..rolls).try_fold(start, |state, _| model.step_single(&state).map(|(_, next)| next))
}

/// Walk ten-draw blocks until `rolls` draws are covered.
pub fn walk_tens<M: DrawModel + ?Sized>(model: &M, start: DrawState, rolls: u32) -> Vec<TenDraw> {
    let blocks = (rolls as usize).div_ceil(TEN_DRAW_SIZE);
    let mut out = Vec::with_capacity(blocks);
    let mut state = start;
    for _ in 0..blocks {
        let Some(block) = model.resolve_ten(&state) else {
            break;
        };
        state = block.next;
        out.push(block);
    }
    out
}
