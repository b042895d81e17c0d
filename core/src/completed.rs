//! Roll topology for a banner whose featured stock is exhausted or ignored.
//!
//! The stream is laid out as a flat node arena, two columns wide (A/B).
//! Node `i` reads `S[i]` for its rarity and `S[i+1]` for its slot; a
//! duplicate reroll reads `S[i+2]`. Every node also carries a guaranteed
//! variant ("G" sub-track) built from the same two values.
//!
//! Cursor advance per draw:
//!   - ordinary draw:           2 nodes
//!   - ordinary draw + reroll:  3 nodes
//!   - single pity draw:        2 nodes
//!   - ten-draw pity:           1 node for the block's rarity decision,
//!                              1 node for the slot at the pity position.

use crate::{
    config::BannerConfig,
    draw::{self, DrawKind, DrawModel, DrawState, ResolvedDraw, RollRecord, TenDraw, TEN_DRAW_SIZE},
    rng::SeedStream,
    roll::{
        address_from_index, is_duplicate_reroll, rarity_from_roll, reroll_item, slot_from_roll,
        slot_index,
    },
    types::{ItemId, Rarity, Seed, NO_ITEM, RATE_SCALE},
};
use serde::Serialize;

pub const COMPLETED_COLUMNS: usize = 2;

const MIN_STREAM_LEN: usize = 20_000;
const MIN_NODE_COUNT: usize = 6_000;

/// The pity alternative co-located with a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuaranteedVariant {
    pub roll:      u32,
    pub rarity:    Rarity,
    pub pool_size: usize,
    pub slot:      usize,
    pub item:      ItemId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedNode {
    pub index:          usize,
    pub address:        String,
    pub prev_seed:      Seed,
    pub seeds:          [Seed; 4],
    pub rarity_roll:    u32,
    pub rarity:         Rarity,
    pub pool_size:      usize,
    pub slot:           Option<usize>,
    pub item:           ItemId,
    /// Replacement if this node's draw is rerolled (Rare with 2+ items only).
    pub reroll_item:    Option<ItemId>,
    /// Duplicate of the node two positions back (or forced).
    pub reroll_flag:    bool,
    /// Duplicate of the reroll result three positions back.
    pub re_reroll_flag: bool,
    pub guaranteed:     Option<GuaranteedVariant>,
}

impl CompletedNode {
    pub fn guaranteed_address(&self) -> String {
        format!("{}G", self.address)
    }
}

pub struct CompletedPathModel<'a> {
    banner:    &'a BannerConfig,
    stream:    SeedStream,
    nodes:     Vec<CompletedNode>,
    force_all: bool,
}

impl<'a> CompletedPathModel<'a> {
    /// Build a table sized for a `rolls`-row view.
    pub fn build(
        banner: &'a BannerConfig,
        seed: Seed,
        rolls: u32,
        initial_last: ItemId,
        force_all: bool,
    ) -> Self {
        let rolls = rolls as usize;
        let node_count = (rolls * 6).max(MIN_NODE_COUNT);
        let stream_len = (rolls * 20).max(MIN_STREAM_LEN);
        Self::with_sizes(banner, seed, node_count, stream_len, initial_last, force_all)
    }

    /// Build exactly `node_count` nodes over a stream of at least `stream_len` successors.
    pub fn with_sizes(
        banner: &'a BannerConfig,
        seed: Seed,
        node_count: usize,
        stream_len: usize,
        initial_last: ItemId,
        force_all: bool,
    ) -> Self {
        let stream = SeedStream::generate(seed, stream_len.max(node_count + 3));
        let mut model = Self {
            banner,
            stream,
            nodes: Vec::with_capacity(node_count),
            force_all,
        };
        for index in 1..=node_count {
            let node = model.build_node(index);
            model.nodes.push(node);
        }
        model.track_rerolls(initial_last);
        log::debug!(
            "completed table: banner={} seed={seed} nodes={} stream={}",
            banner.id,
            model.nodes.len(),
            model.stream.len()
        );
        model
    }

    pub fn banner(&self) -> &BannerConfig {
        self.banner
    }

    pub fn stream(&self) -> &SeedStream {
        &self.stream
    }

    pub fn nodes(&self) -> &[CompletedNode] {
        &self.nodes
    }

    /// Node by 1-based index.
    pub fn node(&self, index: usize) -> Option<&CompletedNode> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    pub fn single_path(&self, start: DrawState, rolls: u32) -> Vec<RollRecord> {
        draw::walk_singles(self, start, rolls)
    }

    pub fn ten_path(&self, start: DrawState, rolls: u32) -> Vec<TenDraw> {
        draw::walk_tens(self, start, rolls)
    }

    fn seed_at(&self, index: usize) -> Seed {
        // The stream is generated with three values of headroom past the last node.
        self.stream.get(index).unwrap_or_default()
    }

    fn build_node(&self, index: usize) -> CompletedNode {
        let seeds = [
            self.seed_at(index),
            self.seed_at(index + 1),
            self.seed_at(index + 2),
            self.seed_at(index + 3),
        ];
        let rarity_roll = seeds[0] % RATE_SCALE;
        let rarity = rarity_from_roll(rarity_roll, self.banner.thresholds());
        let pool = self.banner.pool_for(rarity);
        let item = slot_from_roll(seeds[1], pool);
        let reroll_item = if rarity == Rarity::Rare && pool.len() > 1 {
            reroll_item(seeds[2], pool, item)
        } else {
            None
        };

        CompletedNode {
            index,
            address: address_from_index(index as i64, COMPLETED_COLUMNS),
            prev_seed: self.seed_at(index - 1),
            seeds,
            rarity_roll,
            rarity,
            pool_size: pool.len(),
            slot: slot_index(seeds[1], pool.len()),
            item,
            reroll_item,
            reroll_flag: false,
            re_reroll_flag: false,
            guaranteed: self.guaranteed_variant(seeds[0], seeds[1]),
        }
    }

    fn guaranteed_variant(&self, rarity_seed: Seed, slot_seed: Seed) -> Option<GuaranteedVariant> {
        let divisor = self.banner.guaranteed_divisor();
        if divisor == 0 {
            return None;
        }
        let (uber_weight, _) = self.banner.guaranteed_weights();
        let roll = rarity_seed % divisor;
        let rarity = if roll < uber_weight { Rarity::Uber } else { Rarity::Legend };
        let pool = self.banner.pool_for(rarity);
        let slot = slot_seed as usize % pool.len().max(1);
        Some(GuaranteedVariant {
            roll,
            rarity,
            pool_size: pool.len(),
            slot,
            item: pool.get(slot).copied().unwrap_or(NO_ITEM),
        })
    }

    /// Raw per-node reroll eligibility, independent of any path.
    fn track_rerolls(&mut self, initial_last: ItemId) {
        for i in 0..self.nodes.len() {
            let two_back = if i >= 2 { self.nodes[i - 2].item } else { initial_last };
            let three_back_reroll = i
                .checked_sub(3)
                .map(|j| &self.nodes[j])
                .filter(|n| n.reroll_flag || n.re_reroll_flag)
                .and_then(|n| n.reroll_item);

            let node = &mut self.nodes[i];
            node.reroll_flag = is_duplicate_reroll(
                node.rarity,
                node.pool_size,
                node.item,
                two_back,
                self.force_all,
            );
            node.re_reroll_flag = node.rarity == Rarity::Rare
                && node.item != NO_ITEM
                && three_back_reroll == Some(node.item);
        }
    }

    fn resolve_ordinary(&self, node: &CompletedNode, last_item: ItemId) -> ResolvedDraw {
        let duplicate = is_duplicate_reroll(
            node.rarity,
            node.pool_size,
            node.item,
            last_item,
            self.force_all,
        );
        let replacement = node.reroll_item.filter(|_| duplicate || node.re_reroll_flag);
        let item = replacement.unwrap_or(node.item);
        ResolvedDraw {
            kind: DrawKind::Ordinary,
            item,
            rarity: (item != NO_ITEM).then_some(node.rarity),
            reroll: replacement.is_some(),
            node_index: node.index,
            address: node.address.clone(),
            cost: if replacement.is_some() { 3 } else { 2 },
        }
    }

    fn resolve_pity_single(&self, node: &CompletedNode, g: &GuaranteedVariant) -> ResolvedDraw {
        ResolvedDraw {
            kind: DrawKind::Pity,
            item: g.item,
            rarity: (g.item != NO_ITEM).then_some(g.rarity),
            reroll: false,
            node_index: node.index,
            address: node.guaranteed_address(),
            cost: 2,
        }
    }

    /// Ten-draw pity slot: the rarity was fixed at the block head, the slot
    /// comes from this node's own rarity seed.
    fn resolve_pity_slot(&self, node: &CompletedNode, rarity: Rarity) -> ResolvedDraw {
        let pool = self.banner.pool_for(rarity);
        let item = pool
            .get(node.seeds[0] as usize % pool.len().max(1))
            .copied()
            .unwrap_or(NO_ITEM);
        ResolvedDraw {
            kind: DrawKind::Pity,
            item,
            rarity: (item != NO_ITEM).then_some(rarity),
            reroll: false,
            node_index: node.index,
            address: node.guaranteed_address(),
            cost: 1,
        }
    }
}

impl DrawModel for CompletedPathModel<'_> {
    fn guaranteed_cycle(&self) -> u32 {
        self.banner.guaranteed_cycle
    }

    fn address_of(&self, index: usize) -> String {
        address_from_index(index as i64, COMPLETED_COLUMNS)
    }

    fn resolve_single(&self, state: &DrawState) -> Option<ResolvedDraw> {
        let node = self.node(state.cursor)?;
        let draw = match (&node.guaranteed, state.pity.is_due()) {
            (Some(g), true) => self.resolve_pity_single(node, g),
            _ => self.resolve_ordinary(node, state.last_item),
        };
        Some(draw)
    }

    fn resolve_ten(&self, state: &DrawState) -> Option<TenDraw> {
        let cycle = self.guaranteed_cycle();
        let pity_slot = state.pity.position_in_block(TEN_DRAW_SIZE);
        let mut cursor = state.cursor;

        // The pity rarity is decided once, from the block's lead seed,
        // before any of the ten draws is resolved.
        let pity_rarity = match pity_slot {
            Some(_) => self.node(cursor)?.guaranteed.as_ref().map(|g| g.rarity),
            None => None,
        };
        let pity_head = pity_rarity.map(|_| cursor);
        if pity_rarity.is_some() {
            cursor += 1;
        }

        let mut last_item = state.last_item;
        let mut pity = state.pity;
        let mut draws = Vec::with_capacity(TEN_DRAW_SIZE);
        for position in 0..TEN_DRAW_SIZE {
            let node = self.node(cursor)?;
            let draw = match pity_rarity.filter(|_| pity_slot == Some(position)) {
                Some(rarity) => self.resolve_pity_slot(node, rarity),
                None => self.resolve_ordinary(node, last_item),
            };
            cursor += draw.cost;
            last_item = draw.item;
            pity = pity.advance(cycle);
            draws.push(draw);
        }

        Some(TenDraw {
            start: *state,
            draws,
            next: DrawState { cursor, last_item, pity },
            pity_head,
        })
    }
}
