//! The engine facade: master data plus a request in, a report out.
//!
//! RULES:
//!   - Tables are built fresh per call and dropped with the report.
//!   - The only failures are a missing banner and an invalid pity counter.
//!     Configuration defects travel inside the report as diagnostics.
//!   - "No route found" is a normal outcome (`RouteReport::outcome == None`).

use crate::{
    completed::{CompletedNode, CompletedPathModel},
    config::{BannerConfig, ItemCatalog, MasterData},
    draw::{DrawModel, RollRecord, TenDraw},
    error::GachaResult,
    highlight::RouteHighlight,
    request::{ResolvedMode, RouteRequest, SimulationRequest},
    search::{RouteSearch, SearchObjective, SearchOutcome},
    types::Seed,
    uncompleted::{
        StockedRoll, TenPullCycle, UncompletedNode, UncompletedPathModel, DEFAULT_CYCLE_COUNT,
        EXPECTED_COUNT_MAX_SINGLES,
    },
};
use serde::Serialize;
use std::collections::BTreeMap;

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CompletedReport {
    pub banner_id:    String,
    pub seed:         Seed,
    pub rolls:        u32,
    /// The first `rolls * 2` nodes (the visible table).
    pub nodes:        Vec<CompletedNode>,
    pub single_route: Vec<RollRecord>,
    pub ten_route:    Vec<TenDraw>,
    pub highlight:    RouteHighlight,
    pub diagnostics:  Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UncompletedReport {
    pub banner_id:         String,
    pub seed:              Seed,
    pub rolls:             u32,
    pub featured_stock:    u32,
    /// The first `rolls * 3` nodes (the visible table).
    pub nodes:             Vec<UncompletedNode>,
    pub single_route:      Vec<StockedRoll>,
    pub highlight:         RouteHighlight,
    pub ten_pull_cycles:   Vec<TenPullCycle>,
    /// Singles drawn first → featured items in the following ten-pull.
    pub expected_featured: BTreeMap<u32, u32>,
    pub diagnostics:       Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SimulationReport {
    Completed(CompletedReport),
    Uncompleted(UncompletedReport),
}

impl SimulationReport {
    pub fn mode(&self) -> ResolvedMode {
        match self {
            SimulationReport::Completed(_) => ResolvedMode::Completed,
            SimulationReport::Uncompleted(_) => ResolvedMode::Uncompleted,
        }
    }

    pub fn highlight(&self) -> &RouteHighlight {
        match self {
            SimulationReport::Completed(r) => &r.highlight,
            SimulationReport::Uncompleted(r) => &r.highlight,
        }
    }

    pub fn to_json(&self) -> GachaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub banner_id: String,
    pub model:     ResolvedMode,
    pub budget:    usize,
    pub outcome:   Option<SearchOutcome>,
}

impl RouteReport {
    pub fn found(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn to_json(&self) -> GachaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Engine ──────────────────────────────────────────────────────────────────

pub struct GachaEngine {
    master: MasterData,
}

impl GachaEngine {
    pub fn new(master: MasterData) -> Self {
        Self { master }
    }

    pub fn load(data_dir: &str) -> GachaResult<Self> {
        Ok(Self::new(MasterData::load(data_dir)?))
    }

    /// Engine over the built-in master data. For tests.
    pub fn build_test() -> Self {
        Self::new(MasterData::default_test())
    }

    pub fn master(&self) -> &MasterData {
        &self.master
    }

    pub fn simulate(&self, request: &SimulationRequest) -> GachaResult<SimulationReport> {
        let banner = self.master.banner(&request.banner_id)?;
        request.validate(banner)?;
        let mode = request.resolve_mode(banner);
        log::debug!(
            "simulate banner={} seed={} rolls={} pity={} mode={mode:?}",
            banner.id,
            request.seed,
            request.rolls,
            request.pity
        );

        let report = match mode {
            ResolvedMode::Completed => SimulationReport::Completed(simulate_completed(banner, request)),
            ResolvedMode::Uncompleted => {
                SimulationReport::Uncompleted(simulate_uncompleted(banner, request))
            }
        };
        Ok(report)
    }

    pub fn search(&self, request: &RouteRequest) -> GachaResult<RouteReport> {
        let simulation = &request.simulation;
        let banner = self.master.banner(&simulation.banner_id)?;
        simulation.validate(banner)?;
        let model = simulation.resolve_mode(banner);

        let horizon = table_horizon(simulation.rolls, request.tickets);
        let outcome = match model {
            ResolvedMode::Completed => {
                let table = CompletedPathModel::build(
                    banner,
                    simulation.seed,
                    horizon,
                    simulation.last_item,
                    simulation.force_rare_rerolls,
                );
                run_search(&table, &self.master.catalog, request)
            }
            ResolvedMode::Uncompleted => {
                let table = UncompletedPathModel::build(
                    banner,
                    simulation.seed,
                    horizon,
                    simulation.force_rare_rerolls,
                );
                run_search(&table, &self.master.catalog, request)
            }
        };

        if outcome.is_none() {
            log::debug!("no route found for banner {} within {} tickets", banner.id, request.tickets);
        }
        Ok(RouteReport {
            banner_id: banner.id.clone(),
            model,
            budget: request.tickets,
            outcome,
        })
    }
}

/// Rows to build for a search: the table must reach as far as the whole
/// budget spent on rerolled singles. Budgets past `u32::MAX` saturate.
fn table_horizon(rolls: u32, tickets: usize) -> u32 {
    rolls.max(u32::try_from(tickets).unwrap_or(u32::MAX))
}

fn run_search<M: DrawModel>(
    model: &M,
    catalog: &ItemCatalog,
    request: &RouteRequest,
) -> Option<SearchOutcome> {
    let mut search = RouteSearch::new(model, catalog)
        .with_objective(SearchObjective::new(request.target_layers.clone()));
    if let Some(width) = request.beam_width {
        search = search.with_beam_width(width);
    }
    search.run(request.simulation.initial_state(), request.tickets)
}

fn simulate_completed(banner: &BannerConfig, request: &SimulationRequest) -> CompletedReport {
    let model = CompletedPathModel::build(
        banner,
        request.seed,
        request.rolls,
        request.last_item,
        request.force_rare_rerolls,
    );
    let start = request.initial_state();
    let single_route = model.single_path(start, request.rolls);
    let ten_route = model.ten_path(start, request.rolls);
    let highlight = RouteHighlight::from_routes(&single_route, &ten_route, |i| model.address_of(i));

    let visible = (request.rolls as usize * 2).min(model.nodes().len());
    CompletedReport {
        banner_id: banner.id.clone(),
        seed: request.seed,
        rolls: request.rolls,
        nodes: model.nodes()[..visible].to_vec(),
        single_route,
        ten_route,
        highlight,
        diagnostics: banner.diagnostics().to_vec(),
    }
}

fn simulate_uncompleted(banner: &BannerConfig, request: &SimulationRequest) -> UncompletedReport {
    let model = UncompletedPathModel::build(
        banner,
        request.seed,
        request.rolls,
        request.force_rare_rerolls,
    );
    let start = request.initial_state();
    let stock = request.stock(banner);
    let single_route = model.single_path(start, request.rolls, stock);

    let mut highlight = RouteHighlight::new();
    let records: Vec<RollRecord> = single_route
        .iter()
        .map(|r| RollRecord { roll: r.roll, draw: r.draw.clone() })
        .collect();
    highlight.mark_singles(&records);

    let visible = (request.rolls as usize * 3).min(model.nodes().len());
    UncompletedReport {
        banner_id: banner.id.clone(),
        seed: request.seed,
        rolls: request.rolls,
        featured_stock: stock,
        nodes: model.nodes()[..visible].to_vec(),
        single_route,
        highlight,
        ten_pull_cycles: model.ten_pull_cycles(start, DEFAULT_CYCLE_COUNT),
        expected_featured: model.expected_featured_counts(start, EXPECTED_COUNT_MAX_SINGLES),
        diagnostics: banner.diagnostics().to_vec(),
    }
}
