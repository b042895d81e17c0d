//! Width-bounded dynamic-programming search over a ticket budget.
//!
//! RULE: Tiers are indexed by tickets spent and processed strictly in
//! increasing order. A tier is pruned to the beam width before any of its
//! states expands, never after.
//!
//! RULE: The result comes from the highest non-empty tier, even when a lower
//! tier holds a better score. Spending the full budget wins over score.
//!
//! Ties are broken by the state key, so two runs over the same inputs walk
//! the same states in the same order and return the same path.

use crate::{
    config::ItemCatalog,
    draw::{DrawModel, DrawState, ResolvedDraw, TEN_DRAW_SIZE},
    roll::PityCounter,
    types::{ItemId, Rarity},
};
use serde::Serialize;
use std::collections::BTreeMap;

/// States kept per tier.
pub const BEAM_WIDTH: usize = 1000;

pub const SINGLE_TICKETS: usize = 1;
pub const TEN_TICKETS: usize = TEN_DRAW_SIZE;

const UBER_WEIGHT: u64 = 10_000;
const LEGEND_WEIGHT: u64 = 1_000;

// ── Objective ───────────────────────────────────────────────────────────────

/// Ordered priority layers of wanted item ids. The first layer dominates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchObjective {
    pub target_layers: Vec<Vec<ItemId>>,
}

impl SearchObjective {
    pub fn new(target_layers: Vec<Vec<ItemId>>) -> Self {
        let target_layers = target_layers.into_iter().filter(|l| !l.is_empty()).collect();
        Self { target_layers }
    }

    fn layer_of(&self, item: ItemId) -> Option<usize> {
        self.target_layers.iter().position(|layer| layer.contains(&item))
    }
}

/// Compared lexicographically: layer hits first, then the rarity weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Score {
    pub layer_hits: Vec<u32>,
    pub weighted:   u64,
}

// ── States ──────────────────────────────────────────────────────────────────

/// Two states with the same key have identical futures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey {
    pub cursor:    usize,
    pub last_item: ItemId,
    pub pity:      PityCounter,
}

impl From<DrawState> for StateKey {
    fn from(s: DrawState) -> Self {
        Self { cursor: s.cursor, last_item: s.last_item, pity: s.pity }
    }
}

impl From<StateKey> for DrawState {
    fn from(k: StateKey) -> Self {
        Self { cursor: k.cursor, last_item: k.last_item, pity: k.pity }
    }
}

#[derive(Debug, Clone)]
struct SearchState {
    ubers:      u32,
    legends:    u32,
    layer_hits: Vec<u32>,
    rolls:      u32,
    /// Last step of the path that reached this state; `None` at the root.
    link:       Option<usize>,
}

impl SearchState {
    fn score(&self) -> Score {
        Score {
            layer_hits: self.layer_hits.clone(),
            weighted:   weighted(self.ubers, self.legends),
        }
    }
}

fn weighted(ubers: u32, legends: u32) -> u64 {
    ubers as u64 * UBER_WEIGHT + legends as u64 * LEGEND_WEIGHT
}

/// One step of a path. Draw outcomes are not stored; they are replayed from
/// the model when the winning path is materialized.
#[derive(Debug, Clone, Copy)]
struct PathLink {
    parent: Option<usize>,
    from:   DrawState,
    ten:    bool,
}

type Tier = BTreeMap<StateKey, SearchState>;

// ── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawnItem {
    pub item:       ItemId,
    pub name:       String,
    pub rarity:     Option<Rarity>,
    pub guaranteed: bool,
    pub reroll:     bool,
    pub featured:   bool,
    /// Cell the draw resolved at; pity cells of the completed model end in `G`.
    pub cell:       String,
}

impl DrawnItem {
    fn from_draw(draw: &ResolvedDraw, catalog: &ItemCatalog) -> Self {
        Self {
            item:       draw.item,
            name:       catalog.name_of(draw.item).to_string(),
            rarity:     draw.rarity,
            guaranteed: draw.is_pity(),
            reroll:     draw.reroll,
            featured:   draw.is_featured(),
            cell:       draw.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathEvent {
    Single { address: String, item: DrawnItem },
    Ten { address: String, items: Vec<DrawnItem> },
}

impl PathEvent {
    pub fn address(&self) -> &str {
        match self {
            PathEvent::Single { address, .. } | PathEvent::Ten { address, .. } => address,
        }
    }

    pub fn items(&self) -> &[DrawnItem] {
        match self {
            PathEvent::Single { item, .. } => std::slice::from_ref(item),
            PathEvent::Ten { items, .. } => items,
        }
    }

    pub fn is_ten(&self) -> bool {
        matches!(self, PathEvent::Ten { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub path:        Vec<PathEvent>,
    pub ubers:       u32,
    pub legends:     u32,
    pub layer_hits:  Vec<u32>,
    pub rolls:       u32,
    pub tickets:     usize,
    pub score:       u64,
    pub final_state: DrawState,
}

impl SearchOutcome {
    /// Every cell the route consumed, in draw order.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.path.iter().flat_map(|e| e.items().iter().map(|i| i.cell.as_str()))
    }
}

// ── Search ──────────────────────────────────────────────────────────────────

pub struct RouteSearch<'a, M: DrawModel> {
    model:      &'a M,
    catalog:    &'a ItemCatalog,
    objective:  SearchObjective,
    beam_width: usize,
}

impl<'a, M: DrawModel> RouteSearch<'a, M> {
    pub fn new(model: &'a M, catalog: &'a ItemCatalog) -> Self {
        Self {
            model,
            catalog,
            objective: SearchObjective::default(),
            beam_width: BEAM_WIDTH,
        }
    }

    pub fn with_objective(mut self, objective: SearchObjective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width.max(1);
        self
    }

    /// Best route spending at most `budget` tickets, or `None` when no draw
    /// fits at all.
    pub fn run(&self, start: DrawState, budget: usize) -> Option<SearchOutcome> {
        let mut tiers: Vec<Tier> = vec![Tier::new(); budget + 1];
        let mut links: Vec<PathLink> = Vec::new();
        let mut pruned = 0usize;

        tiers[0].insert(
            start.into(),
            SearchState {
                ubers:      0,
                legends:    0,
                layer_hits: vec![0; self.objective.target_layers.len()],
                rolls:      0,
                link:       None,
            },
        );

        for t in 0..=budget {
            if tiers[t].is_empty() {
                continue;
            }
            if tiers[t].len() > self.beam_width {
                pruned += tiers[t].len() - self.beam_width;
                let tier = std::mem::take(&mut tiers[t]);
                tiers[t] = self.prune(tier);
            }
            log::trace!("tier {t}: {} states", tiers[t].len());

            let current = std::mem::take(&mut tiers[t]);
            for (key, state) in &current {
                if t + SINGLE_TICKETS <= budget {
                    self.expand(*key, state, false, &mut links, &mut tiers[t + SINGLE_TICKETS]);
                }
                if t + TEN_TICKETS <= budget {
                    self.expand(*key, state, true, &mut links, &mut tiers[t + TEN_TICKETS]);
                }
            }
            tiers[t] = current;
        }

        let found = (0..=budget)
            .rev()
            .find_map(|t| self.best_in(&tiers[t]).map(|best| (t, best)));
        let (tickets, (key, state)) = match found {
            Some((0, _)) if budget > 0 => None,
            other => other,
        }?;

        let outcome = SearchOutcome {
            path:        self.replay(&links, state.link),
            ubers:       state.ubers,
            legends:     state.legends,
            layer_hits:  state.layer_hits.clone(),
            rolls:       state.rolls,
            tickets,
            score:       weighted(state.ubers, state.legends),
            final_state: key.into(),
        };
        log::debug!(
            "route search: budget={budget} tickets={tickets} ubers={} legends={} events={} links={} pruned={pruned}",
            outcome.ubers,
            outcome.legends,
            outcome.path.len(),
            links.len()
        );
        Some(outcome)
    }

    fn expand(
        &self,
        key: StateKey,
        state: &SearchState,
        ten: bool,
        links: &mut Vec<PathLink>,
        target: &mut Tier,
    ) {
        let from = DrawState::from(key);
        let (draws, next) = if ten {
            match self.model.resolve_ten(&from) {
                Some(block) => (block.draws, block.next),
                None => return,
            }
        } else {
            match self.model.step_single(&from) {
                Some((draw, next)) => (vec![draw], next),
                None => return,
            }
        };

        let mut candidate = SearchState {
            ubers:      state.ubers,
            legends:    state.legends,
            layer_hits: state.layer_hits.clone(),
            rolls:      state.rolls + draws.len() as u32,
            link:       None,
        };
        for draw in &draws {
            match draw.rarity {
                Some(Rarity::Uber)   => candidate.ubers += 1,
                Some(Rarity::Legend) => candidate.legends += 1,
                _ => {}
            }
            if let Some(layer) = self.objective.layer_of(draw.item) {
                candidate.layer_hits[layer] += 1;
            }
        }

        let next_key = StateKey::from(next);
        let better = match target.get(&next_key) {
            Some(existing) => candidate.score() > existing.score(),
            None => true,
        };
        if !better {
            return;
        }
        links.push(PathLink { parent: state.link, from, ten });
        candidate.link = Some(links.len() - 1);
        target.insert(next_key, candidate);
    }

    /// Keep the `beam_width` best states; ties go to the smaller key.
    fn prune(&self, tier: Tier) -> Tier {
        let mut ranked: Vec<(StateKey, SearchState)> = tier.into_iter().collect();
        ranked.sort_by(|(ka, a), (kb, b)| b.score().cmp(&a.score()).then(ka.cmp(kb)));
        ranked.truncate(self.beam_width);
        ranked.into_iter().collect()
    }

    fn best_in<'t>(&self, tier: &'t Tier) -> Option<(StateKey, &'t SearchState)> {
        let mut best: Option<(StateKey, &SearchState)> = None;
        for (key, state) in tier {
            match best {
                Some((_, b)) if state.score() <= b.score() => {}
                _ => best = Some((*key, state)),
            }
        }
        best
    }

    fn replay(&self, links: &[PathLink], last: Option<usize>) -> Vec<PathEvent> {
        let mut steps = Vec::new();
        let mut cursor = last;
        while let Some(i) = cursor {
            steps.push(links[i]);
            cursor = links[i].parent;
        }
        steps.reverse();

        steps
            .into_iter()
            .filter_map(|step| {
                let address = self.model.address_of(step.from.cursor);
                if step.ten {
                    let block = self.model.resolve_ten(&step.from)?;
                    let items = block
                        .draws
                        .iter()
                        .map(|d| DrawnItem::from_draw(d, self.catalog))
                        .collect();
                    Some(PathEvent::Ten { address, items })
                } else {
                    let draw = self.model.resolve_single(&step.from)?;
                    let item = DrawnItem::from_draw(&draw, self.catalog);
                    Some(PathEvent::Single { address, item })
                }
            })
            .collect()
    }
}
