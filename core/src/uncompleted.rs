//! Roll topology for a banner whose featured stock is still available.
//!
//! Three columns wide (A/B/C). Node `i` tests `S[i]` for a featured hit, then
//! reads `S[i+1]` (rarity), `S[i+2]` (slot) and, on a duplicate, `S[i+3]`.
//!
//! RULE: A guaranteed draw in this model is structural. It yields the
//! featured item and consumes no stream value at all; a featured hit
//! consumes one, an ordinary draw three, a rerolled one four.
//!
//! The ten-pull lays the stream out differently from ten singles: all ten
//! featured tests come first, one value each, and the ordinary draws for the
//! misses follow from where the tests stopped.

use crate::{
    config::BannerConfig,
    draw::{self, DrawKind, DrawModel, DrawState, ResolvedDraw, TenDraw, TEN_DRAW_SIZE},
    rng::SeedStream,
    roll::{
        address_from_index, is_duplicate_reroll, rarity_from_roll, reroll_item, slot_from_roll,
        slot_index, PityCounter,
    },
    types::{ItemId, Rarity, Seed, FEATURED_ITEM, NO_ITEM, RATE_SCALE},
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const UNCOMPLETED_COLUMNS: usize = 3;

/// Ten-pull cycles chained by the report.
pub const DEFAULT_CYCLE_COUNT: u32 = 10;

/// Largest single-draw prefix the expected-count projection covers.
pub const EXPECTED_COUNT_MAX_SINGLES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncompletedNode {
    pub index:            usize,
    pub address:          String,
    pub prev_seed:        Seed,
    pub seeds:            [Seed; 4],
    pub featured:         bool,
    pub rarity_roll:      u32,
    pub rarity:           Rarity,
    /// Half-open `[lower, upper)` roll range of `rarity`.
    pub rarity_range:     (u32, u32),
    pub pool_size:        usize,
    pub slot:             Option<usize>,
    pub item:             ItemId,
    pub reroll_item:      Option<ItemId>,
    pub featured_next:    String,
    pub ordinary_next:    String,
    pub reroll_next:      String,
}

/// A single draw plus the featured stock around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockedRoll {
    pub roll:       u32,
    #[serde(flatten)]
    pub draw:       ResolvedDraw,
    /// The draw was a featured hit that took one unit of stock.
    pub stock_used: bool,
    pub stock_left: u32,
}

/// One of the up-front featured tests of a ten-pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeaturedTest {
    /// 1-based roll within the ten-pull.
    pub roll:         usize,
    /// Stream index tested; `None` for a guaranteed roll, which skips the test.
    pub stream_index: Option<usize>,
    pub featured:     bool,
    pub guaranteed:   bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenPullCycle {
    pub cycle:          u32,
    pub start:          DrawState,
    pub featured_tests: Vec<FeaturedTest>,
    pub draws:          Vec<ResolvedDraw>,
    /// Featured items obtained, guaranteed rolls included.
    pub featured_count: u32,
    pub next:           DrawState,
}

impl TenPullCycle {
    /// False when the stream ran out before all ten rolls resolved.
    pub fn is_complete(&self) -> bool {
        self.draws.len() == TEN_DRAW_SIZE
    }

    /// Stream values consumed by the whole cycle.
    pub fn consumed(&self) -> usize {
        self.next.cursor - self.start.cursor
    }
}

/// Rarity/slot/reroll outcome read from consecutive stream values.
struct OrdinaryRoll {
    rarity:   Rarity,
    item:     ItemId,
    rerolled: bool,
    consumed: usize,
}

pub struct UncompletedPathModel<'a> {
    banner:    &'a BannerConfig,
    stream:    SeedStream,
    nodes:     Vec<UncompletedNode>,
    force_all: bool,
}

impl<'a> UncompletedPathModel<'a> {
    pub fn build(banner: &'a BannerConfig, seed: Seed, rolls: u32, force_all: bool) -> Self {
        let rolls = rolls as usize;
        Self::with_sizes(banner, seed, rolls * 3 + 20, rolls * 10 + 1000, force_all)
    }

    pub fn with_sizes(
        banner: &'a BannerConfig,
        seed: Seed,
        node_count: usize,
        stream_len: usize,
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
        log::debug!(
            "uncompleted table: banner={} seed={seed} nodes={} stream={}",
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

    pub fn nodes(&self) -> &[UncompletedNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&UncompletedNode> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    fn build_node(&self, index: usize) -> UncompletedNode {
        let seed_at = |i: usize| self.stream.get(i).unwrap_or_default();
        let seeds = [seed_at(index), seed_at(index + 1), seed_at(index + 2), seed_at(index + 3)];
        let rarity_roll = seeds[1] % RATE_SCALE;
        let rarity = rarity_from_roll(rarity_roll, self.banner.thresholds());
        let pool = self.banner.pool_for(rarity);
        let item = slot_from_roll(seeds[2], pool);
        let reroll_item = if rarity == Rarity::Rare && pool.len() > 1 {
            reroll_item(seeds[3], pool, item)
        } else {
            None
        };
        let address = |i: usize| address_from_index(i as i64, UNCOMPLETED_COLUMNS);

        UncompletedNode {
            index,
            address: address(index),
            prev_seed: seed_at(index - 1),
            seeds,
            featured: self.is_featured_hit(seeds[0]),
            rarity_roll,
            rarity,
            rarity_range: self.banner.thresholds().range_of(rarity),
            pool_size: pool.len(),
            slot: slot_index(seeds[2], pool.len()),
            item,
            reroll_item,
            featured_next: address(index + 1),
            ordinary_next: address(index + 3),
            reroll_next: address(index + 4),
        }
    }

    fn is_featured_hit(&self, value: Seed) -> bool {
        value % RATE_SCALE < self.banner.featured_item_rate
    }

    /// Ordinary draw whose rarity value sits at stream index `at`.
    fn ordinary_at(&self, at: usize, last_item: ItemId) -> Option<OrdinaryRoll> {
        let rarity_value = self.stream.get(at)?;
        let slot_value = self.stream.get(at + 1)?;
        let rarity = rarity_from_roll(rarity_value % RATE_SCALE, self.banner.thresholds());
        let pool = self.banner.pool_for(rarity);
        let item = slot_from_roll(slot_value, pool);

        if is_duplicate_reroll(rarity, pool.len(), item, last_item, self.force_all) {
            // A pool of one repeated id has nothing to reroll into.
            if let Some(replacement) = reroll_item(self.stream.get(at + 2)?, pool, item) {
                return Some(OrdinaryRoll { rarity, item: replacement, rerolled: true, consumed: 3 });
            }
        }
        Some(OrdinaryRoll { rarity, item, rerolled: false, consumed: 2 })
    }

    /// Walk `rolls` single draws, decrementing `stock` on featured hits.
    pub fn single_path(&self, start: DrawState, rolls: u32, stock: u32) -> Vec<StockedRoll> {
        let mut stock_left = stock;
        draw::walk_singles(self, start, rolls)
            .into_iter()
            .map(|record| {
                let stock_used = record.draw.is_featured() && stock_left > 0;
                if stock_used {
                    stock_left -= 1;
                }
                StockedRoll {
                    roll: record.roll,
                    draw: record.draw,
                    stock_used,
                    stock_left,
                }
            })
            .collect()
    }

    /// One ten-pull from `start`. The result may be incomplete near the end
    /// of the stream; check [`TenPullCycle::is_complete`].
    pub fn ten_pull(&self, start: DrawState) -> TenPullCycle {
        let cycle_len = self.guaranteed_cycle();
        let base = start.cursor;

        let mut featured_tests = Vec::with_capacity(TEN_DRAW_SIZE);
        let mut pity = start.pity;
        let mut tested = 0usize;
        for roll in 1..=TEN_DRAW_SIZE {
            if pity.is_due() {
                featured_tests.push(FeaturedTest {
                    roll,
                    stream_index: None,
                    featured: false,
                    guaranteed: true,
                });
            } else {
                let index = base + tested;
                let Some(value) = self.stream.get(index) else {
                    break;
                };
                featured_tests.push(FeaturedTest {
                    roll,
                    stream_index: Some(index),
                    featured: self.is_featured_hit(value),
                    guaranteed: false,
                });
                tested += 1;
            }
            pity = pity.advance(cycle_len);
        }

        let mut cursor = base + tested;
        let mut last_item = start.last_item;
        let mut pity = start.pity;
        let mut featured_count = 0u32;
        let mut draws = Vec::with_capacity(TEN_DRAW_SIZE);
        for test in &featured_tests {
            let draw = if test.guaranteed || test.featured {
                featured_count += 1;
                let anchor = test.stream_index.unwrap_or(cursor);
                ResolvedDraw {
                    kind: if test.guaranteed { DrawKind::Pity } else { DrawKind::Featured },
                    item: FEATURED_ITEM,
                    rarity: None,
                    reroll: false,
                    node_index: anchor,
                    address: self.address_of(anchor),
                    cost: usize::from(test.featured),
                }
            } else {
                let Some(ordinary) = self.ordinary_at(cursor, last_item) else {
                    break;
                };
                let draw = ResolvedDraw {
                    kind: DrawKind::Ordinary,
                    item: ordinary.item,
                    rarity: (ordinary.item != NO_ITEM).then_some(ordinary.rarity),
                    reroll: ordinary.rerolled,
                    node_index: cursor,
                    address: self.address_of(cursor),
                    cost: ordinary.consumed,
                };
                cursor += ordinary.consumed;
                draw
            };
            last_item = draw.item;
            pity = pity.advance(cycle_len);
            draws.push(draw);
        }

        TenPullCycle {
            cycle: 1,
            start,
            featured_tests,
            draws,
            featured_count,
            next: DrawState { cursor, last_item, pity },
        }
    }

    /// Chain up to `cycles` ten-pulls, each starting where the previous one
    /// stopped. Stops after the first incomplete cycle.
    pub fn ten_pull_cycles(&self, start: DrawState, cycles: u32) -> Vec<TenPullCycle> {
        let mut out = Vec::with_capacity(cycles as usize);
        let mut state = start;
        for cycle in 1..=cycles {
            let mut result = self.ten_pull(state);
            result.cycle = cycle;
            state = result.next;
            let complete = result.is_complete();
            out.push(result);
            if !complete {
                break;
            }
        }
        out
    }

    /// Featured items in the ten-pull that follows `n` single draws, for
    /// every `n` in `0..=max_singles`. An unreachable or incomplete ten-pull
    /// counts 0.
    pub fn expected_featured_counts(&self, start: DrawState, max_singles: u32) -> BTreeMap<u32, u32> {
        (0..=max_singles)
            .map(|n| {
                let count = draw::state_after_singles(self, start, n)
                    .map(|state| self.ten_pull(state))
                    .filter(TenPullCycle::is_complete)
                    .map(|cycle| cycle.featured_count)
                    .unwrap_or(0);
                (n, count)
            })
            .collect()
    }
}

impl DrawModel for UncompletedPathModel<'_> {
    fn guaranteed_cycle(&self) -> u32 {
        self.banner.guaranteed_cycle
    }

    fn address_of(&self, index: usize) -> String {
        address_from_index(index as i64, UNCOMPLETED_COLUMNS)
    }

    fn resolve_single(&self, state: &DrawState) -> Option<ResolvedDraw> {
        let index = state.cursor;
        let value = self.stream.get(index)?;

        if state.pity.is_due() {
            return Some(ResolvedDraw {
                kind: DrawKind::Pity,
                item: FEATURED_ITEM,
                rarity: None,
                reroll: false,
                node_index: index,
                address: self.address_of(index),
                cost: 0,
            });
        }

        if self.is_featured_hit(value) {
            return Some(ResolvedDraw {
                kind: DrawKind::Featured,
                item: FEATURED_ITEM,
                rarity: None,
                reroll: false,
                node_index: index,
                address: self.address_of(index),
                cost: 1,
            });
        }

        let ordinary = self.ordinary_at(index + 1, state.last_item)?;
        Some(ResolvedDraw {
            kind: DrawKind::Ordinary,
            item: ordinary.item,
            rarity: (ordinary.item != NO_ITEM).then_some(ordinary.rarity),
            reroll: ordinary.rerolled,
            node_index: index,
            address: self.address_of(index),
            cost: 1 + ordinary.consumed,
        })
    }

    fn resolve_ten(&self, state: &DrawState) -> Option<TenDraw> {
        let cycle = self.ten_pull(*state);
        if !cycle.is_complete() {
            return None;
        }
        Some(TenDraw {
            start: cycle.start,
            draws: cycle.draws,
            next: cycle.next,
            pity_head: None,
        })
    }
}

impl UncompletedNode {
    /// Where a single draw starting here hands off, given the pity state.
    pub fn next_address(&self, pity: PityCounter, rerolled: bool) -> &str {
        if pity.is_due() {
            &self.address
        } else if self.featured {
            &self.featured_next
        } else if rerolled {
            &self.reroll_next
        } else {
            &self.ordinary_next
        }
    }
}
