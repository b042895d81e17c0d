use gacha_core::{
    completed::CompletedPathModel,
    config::{BannerRecord, ItemRecord, MasterData},
    draw::{DrawKind, DrawModel, DrawState},
    roll::PityCounter,
    types::{Rarity, NO_ITEM},
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn start(pity: PityCounter) -> DrawState {
    DrawState { cursor: 1, last_item: NO_ITEM, pity }
}

fn master_with(record: BannerRecord) -> MasterData {
    let items = vec![
        ItemRecord { id: 10, name: "5K XP".into(), rarity: Rarity::Normal },
        ItemRecord { id: 11, name: "10K XP".into(), rarity: Rarity::Rare },
        ItemRecord { id: 2, name: "Rich Cat".into(), rarity: Rarity::SuperRare },
        ItemRecord { id: 184, name: "Mr. Ninja".into(), rarity: Rarity::Uber },
    ];
    MasterData::from_records(items, vec![record])
}

fn record(id: &str, rates: [u32; 5], pool: Vec<i32>) -> BannerRecord {
    BannerRecord {
        id: id.into(),
        name: id.into(),
        featured_item_rate: 0,
        featured_item_stock: 0,
        guaranteed_cycle: 10,
        uber_guaranteed: true,
        legend_guaranteed: false,
        rarity_rates: rates,
        pool,
    }
}

// ── Node table ──────────────────────────────────────────────────────────────

#[test]
fn table_sizes_follow_the_row_count() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();

    let small = CompletedPathModel::build(banner, 12345, 100, NO_ITEM, false);
    assert_eq!(small.nodes().len(), 6000);
    assert_eq!(small.stream().len(), 20_001);

    let large = CompletedPathModel::build(banner, 12345, 2000, NO_ITEM, false);
    assert_eq!(large.nodes().len(), 12_000);
    assert_eq!(large.stream().len(), 40_001);
}

#[test]
fn nodes_resolve_rarity_slot_and_guaranteed_variant() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 10, NO_ITEM, false);

    let first = model.node(1).unwrap();
    assert_eq!(first.address, "A1");
    assert_eq!(first.prev_seed, 12345);
    assert_eq!(first.seeds[0], 2_409_239_354);
    assert_eq!(first.rarity, Rarity::Uber);
    assert_eq!(first.item, 184);
    assert_eq!(first.guaranteed_address(), "A1G");

    let second = model.node(2).unwrap();
    assert_eq!(second.address, "B1");
    assert_eq!(second.rarity, Rarity::Rare);
    assert_eq!(second.item, 12);
    assert_eq!(second.reroll_item, Some(11));
    let g = second.guaranteed.as_ref().unwrap();
    assert_eq!((g.rarity, g.item), (Rarity::Uber, 831));

    assert!(model.node(0).is_none());
}

#[test]
fn no_guaranteed_variant_without_guaranteed_rarities() {
    let master = MasterData::default_test();
    let banner = master.banner("34").unwrap();
    let model = CompletedPathModel::build(banner, 777, 10, NO_ITEM, false);
    assert!(model.nodes().iter().all(|n| n.guaranteed.is_none()));
}

// ── Single path ─────────────────────────────────────────────────────────────

/// Seed 12345 with the counter at 1: the first draw is the guaranteed one and
/// the counter wraps to the full cycle.
#[test]
fn first_single_draw_is_pity_when_counter_is_one() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 10, NO_ITEM, false);

    let (draw, next) = model.step_single(&start(PityCounter::Remaining(1))).unwrap();
    assert_eq!(draw.kind, DrawKind::Pity);
    assert!(matches!(draw.rarity, Some(Rarity::Uber) | Some(Rarity::Legend)));
    assert_eq!(draw.item, 184);
    assert_eq!(draw.address, "A1G");
    assert_eq!(draw.cost, 2);
    assert_eq!(next.pity, PityCounter::Remaining(10));
    assert_eq!(next.cursor, 3);
}

#[test]
fn single_path_rerolls_duplicates_of_the_last_draw() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 40, NO_ITEM, false);

    let path = model.single_path(start(PityCounter::None), 40);
    assert_eq!(path.len(), 40);

    let rerolled: Vec<u32> = path.iter().filter(|r| r.draw.reroll).map(|r| r.roll).collect();
    assert_eq!(rerolled, vec![8, 9, 13, 21, 31]);

    let mut cursor = 1;
    for record in &path {
        assert_eq!(record.draw.node_index, cursor);
        cursor += record.draw.cost;
        if record.draw.reroll {
            let node = model.node(record.draw.node_index).unwrap();
            assert_eq!(node.rarity, Rarity::Rare);
            assert_ne!(record.draw.item, node.item);
            assert_eq!(record.draw.cost, 3);
        }
    }
    assert_eq!(cursor, 86);
}

#[test]
fn single_rare_item_never_rerolls_even_when_forced() {
    let master = master_with(record("solo", [0, 8000, 1500, 500, 0], vec![11, 2, 184]));
    let banner = master.banner("solo").unwrap();
    let model = CompletedPathModel::build(banner, 4242, 200, 11, true);

    let path = model.single_path(start(PityCounter::None), 200);
    assert!(path.iter().any(|r| r.draw.item == 11));
    assert!(path.iter().all(|r| !r.draw.reroll));
    assert!(model.nodes().iter().all(|n| !n.reroll_flag && n.reroll_item.is_none()));
}

#[test]
fn forced_rerolls_replace_every_rare_draw() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 40, NO_ITEM, true);

    for record in model.single_path(start(PityCounter::None), 40) {
        if record.draw.rarity == Some(Rarity::Rare) {
            assert!(record.draw.reroll, "roll {} was not rerolled", record.roll);
        }
    }
}

/// A rarity with a rate but no items resolves to NO_ITEM and the banner
/// reports the defect instead of failing.
#[test]
fn empty_pool_degrades_to_no_item() {
    let master = master_with(record("broken", [0, 5000, 2000, 3000, 0], vec![11, 2]));
    let banner = master.banner("broken").unwrap();
    assert!(!banner.diagnostics().is_empty());

    let model = CompletedPathModel::build(banner, 12345, 20, NO_ITEM, false);
    let path = model.single_path(start(PityCounter::None), 20);
    assert_eq!(path.len(), 20);
    assert!(path.iter().any(|r| r.draw.item == NO_ITEM && r.draw.rarity.is_none()));
    assert_eq!(master.catalog.name_of(NO_ITEM), "---");
}

// ── Ten-draw path ───────────────────────────────────────────────────────────

/// Counter at 7: the pity rarity is decided from the block's lead node before
/// the first ordinary draw, and the pity slot lands on position 7.
#[test]
fn ten_draw_decides_pity_rarity_at_block_head() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 10, NO_ITEM, false);

    let block = model.resolve_ten(&start(PityCounter::Remaining(7))).unwrap();
    assert_eq!(block.pity_head, Some(1));
    assert_eq!(block.draws.len(), 10);
    assert_eq!(block.draws[0].node_index, 2);
    assert_eq!(block.pity_position(), Some(6));

    let pity = &block.draws[6];
    assert_eq!(pity.item, 831);
    assert_eq!(pity.rarity, Some(Rarity::Uber));
    assert_eq!(pity.cost, 1);
    assert_eq!(pity.address, model.node(15).unwrap().guaranteed_address());

    assert_eq!(block.next.cursor, 23);
    assert_eq!(block.next.last_item, 726);
    assert_eq!(block.next.pity, PityCounter::Remaining(7));
    assert_eq!(block.cost(), 22);
}

#[test]
fn ten_draw_and_singles_diverge_under_pity() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::build(banner, 12345, 10, NO_ITEM, false);
    let from = start(PityCounter::Remaining(7));

    let block = model.resolve_ten(&from).unwrap();
    let singles = model.single_path(from, 10);
    let single_nodes: Vec<usize> = singles.iter().map(|r| r.draw.node_index).collect();
    let ten_nodes: Vec<usize> = block.draws.iter().map(|d| d.node_index).collect();
    assert_ne!(single_nodes, ten_nodes);
    assert_eq!(singles[6].draw.kind, DrawKind::Pity);
}

#[test]
fn ten_path_covers_the_requested_rolls() {
    let master = MasterData::default_test();
    let banner = master.banner("46").unwrap();
    let model = CompletedPathModel::build(banner, 99, 25, NO_ITEM, false);

    let blocks = model.ten_path(start(PityCounter::Remaining(4)), 25);
    assert_eq!(blocks.len(), 3);
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].next, pair[1].start);
    }
    assert!(blocks.iter().all(|b| b.draws.len() == 10));
}

#[test]
fn walking_past_the_table_stops_cleanly() {
    let master = MasterData::default_test();
    let banner = master.banner("45").unwrap();
    let model = CompletedPathModel::with_sizes(banner, 12345, 12, 20, NO_ITEM, false);

    let path = model.single_path(start(PityCounter::None), 50);
    assert!(path.len() < 50);
    assert!(model.resolve_ten(&start(PityCounter::None)).is_none());
}
