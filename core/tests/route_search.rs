use gacha_core::{
    completed::CompletedPathModel,
    config::MasterData,
    draw::{walk_singles, DrawState},
    roll::PityCounter,
    search::{PathEvent, RouteSearch, SearchObjective},
    types::{Rarity, NO_ITEM},
    uncompleted::UncompletedPathModel,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn start(pity: PityCounter) -> DrawState {
    DrawState { cursor: 1, last_item: NO_ITEM, pity }
}

fn weighted_score(rarities: impl Iterator<Item = Option<Rarity>>) -> u64 {
    rarities
        .map(|r| match r {
            Some(Rarity::Uber) => 10_000,
            Some(Rarity::Legend) => 1_000,
            _ => 0,
        })
        .sum()
}

// ── Edge budgets ────────────────────────────────────────────────────────────

#[test]
fn zero_budget_returns_the_initial_state() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 100, NO_ITEM, false);

    let from = start(PityCounter::Remaining(4));
    let outcome = RouteSearch::new(&model, &master.catalog).run(from, 0).unwrap();
    assert!(outcome.path.is_empty());
    assert_eq!((outcome.ubers, outcome.legends, outcome.rolls, outcome.tickets), (0, 0, 0, 0));
    assert_eq!(outcome.final_state, from);
}

/// Ten-draws cost 10 tickets, so a budget of 5 can only be spent on singles.
#[test]
fn small_budget_uses_only_single_draws() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 100, NO_ITEM, false);

    let outcome = RouteSearch::new(&model, &master.catalog)
        .run(start(PityCounter::None), 5)
        .unwrap();
    assert_eq!(outcome.tickets, 5);
    assert_eq!(outcome.path.len(), 5);
    assert!(outcome.path.iter().all(|e| !e.is_ten()));
}

#[test]
fn no_route_when_nothing_can_be_drawn() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::with_sizes(banner, 12345, 0, 10, NO_ITEM, false);

    let outcome = RouteSearch::new(&model, &master.catalog).run(start(PityCounter::None), 5);
    assert!(outcome.is_none());
}

// ── Quality ─────────────────────────────────────────────────────────────────

/// The all-singles route is one of the candidates, so the search result in
/// the full-budget tier can never score below it.
#[test]
fn search_is_at_least_as_good_as_plain_singles() {
    let master = MasterData::default_test();
    for banner_id in ["45", "46"] {
        let banner = master.banner(banner_id).unwrap();
        for seed in [1u32, 12345, 4_000_000_007] {
            let model = CompletedPathModel::build(banner, seed, 100, NO_ITEM, false);
            let from = start(PityCounter::Remaining(6));

            let singles = walk_singles(&model, from, 30);
            let baseline = weighted_score(singles.iter().map(|r| r.draw.rarity));

            let outcome = RouteSearch::new(&model, &master.catalog).run(from, 30).unwrap();
            assert_eq!(outcome.tickets, 30);
            assert!(
                outcome.score >= baseline,
                "banner {banner_id} seed {seed}: {} < {baseline}",
                outcome.score
            );
            assert_eq!(outcome.score, outcome.ubers as u64 * 10_000 + outcome.legends as u64 * 1_000);
        }
    }
}

#[test]
fn pity_single_is_reported_on_the_guaranteed_cell() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 100, NO_ITEM, false);

    let outcome = RouteSearch::new(&model, &master.catalog)
        .run(start(PityCounter::Remaining(1)), 1)
        .unwrap();
    let PathEvent::Single { address, item } = &outcome.path[0] else {
        panic!("expected a single draw");
    };
    assert_eq!(address, "A1");
    assert_eq!(item.cell, "A1G");
    assert!(item.guaranteed);
    assert_eq!(item.name, "Mr. Ninja");
    assert_eq!(outcome.ubers, 1);
    assert_eq!(outcome.score, 10_000);
    assert_eq!(outcome.final_state.pity, PityCounter::Remaining(10));
}

/// The replayed path lands exactly on the reported final state.
#[test]
fn path_replays_to_the_final_state() {
    let master = MasterData::default_test();
    let banner = master.banner("46").unwrap();
    let model = CompletedPathModel::build(banner, 777, 100, NO_ITEM, false);

    let outcome = RouteSearch::new(&model, &master.catalog)
        .run(start(PityCounter::Remaining(9)), 25)
        .unwrap();
    let drawn: usize = outcome.path.iter().map(|e| e.items().len()).sum();
    assert_eq!(drawn as u32, outcome.rolls);
    let ubers = outcome
        .path
        .iter()
        .flat_map(|e| e.items())
        .filter(|i| i.rarity == Some(Rarity::Uber))
        .count();
    assert_eq!(ubers as u32, outcome.ubers);
    assert_eq!(outcome.cells().count(), drawn);
}

#[test]
fn target_layers_dominate_the_score() {
    let master = MasterData::default_test();
    let banner = master.banner("46").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 100, NO_ITEM, false);
    let from = start(PityCounter::Remaining(10));

    let singles = walk_singles(&model, from, 30);
    let baseline_hits = singles.iter().filter(|r| r.draw.item == 11).count() as u32;

    let outcome = RouteSearch::new(&model, &master.catalog)
        .with_objective(SearchObjective::new(vec![vec![11], vec![]]))
        .run(from, 30)
        .unwrap();
    assert_eq!(outcome.layer_hits.len(), 1);
    assert!(outcome.layer_hits[0] >= baseline_hits);
    let hits = outcome.path.iter().flat_map(|e| e.items()).filter(|i| i.item == 11).count();
    assert_eq!(hits as u32, outcome.layer_hits[0]);
}

// ── Determinism ─────────────────────────────────────────────────────────────

#[test]
fn identical_inputs_give_identical_routes() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model_a = CompletedPathModel::build(banner, 31337, 100, NO_ITEM, false);
    let model_b = CompletedPathModel::build(banner, 31337, 100, NO_ITEM, false);
    let from = start(PityCounter::Remaining(3));

    let a = RouteSearch::new(&model_a, &master.catalog).with_beam_width(50).run(from, 60);
    let b = RouteSearch::new(&model_b, &master.catalog).with_beam_width(50).run(from, 60);
    assert_eq!(a, b);
}

#[test]
fn search_runs_over_the_uncompleted_model() {
    let master = MasterData::default_test();
    let banner = master.banner("44").unwrap();
    let model = UncompletedPathModel::build(banner, 12345, 100, false);

    let outcome = RouteSearch::new(&model, &master.catalog)
        .run(start(PityCounter::Remaining(5)), 20)
        .unwrap();
    assert_eq!(outcome.tickets, 20);
    assert!(outcome.path.iter().flat_map(|e| e.items()).any(|i| i.guaranteed));
}
