//! route-runner: headless roll simulator and route finder.
//!
//! Usage:
//!   route-runner --banner 46 --seed 12345 --rolls 50 --pity 7
//!   route-runner --banner 46 --seed 12345 --tickets 30 --target 730,646 --target 197
//!   route-runner --ipc-mode   (JSON requests on stdin, one per line)

use anyhow::Result;
use gacha_core::{
    config::BannerConfig,
    engine::{GachaEngine, RouteReport, SimulationReport},
    request::{ModelMode, RouteRequest, SimulationRequest, DEFAULT_ROLLS},
    roll::PityCounter,
    search::PathEvent,
    types::{ItemId, Seed, NO_ITEM},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    ListBanners,
    Simulate { request: SimulationRequest },
    Search { request: RouteRequest },
    Quit,
}

#[derive(serde::Serialize)]
struct BannerSummary {
    id:               String,
    name:             String,
    featured_rate:    u32,
    featured_stock:   u32,
    guaranteed_cycle: u32,
    diagnostics:      Vec<String>,
}

impl From<&BannerConfig> for BannerSummary {
    fn from(b: &BannerConfig) -> Self {
        Self {
            id:               b.id.clone(),
            name:             b.name.clone(),
            featured_rate:    b.featured_item_rate,
            featured_stock:   b.featured_item_stock,
            guaranteed_cycle: b.guaranteed_cycle,
            diagnostics:      b.diagnostics().to_vec(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let engine = GachaEngine::load(data_dir)?;

    if args.iter().any(|a| a == "--ipc-mode") {
        return run_ipc_loop(&engine);
    }

    let banner_id = match flag_value(&args, "--banner") {
        Some(id) => id.to_string(),
        None => engine
            .master()
            .latest_banner_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No banners in {data_dir}"))?,
    };

    let mut request = SimulationRequest::new(banner_id, parse_arg(&args, "--seed", 12345 as Seed))
        .with_rolls(parse_arg(&args, "--rolls", DEFAULT_ROLLS))
        .with_pity(parse_arg(&args, "--pity", PityCounter::None))
        .with_last_item(parse_arg(&args, "--last", NO_ITEM))
        .with_forced_rerolls(args.iter().any(|a| a == "--force-reroll"))
        .with_mode(parse_mode(flag_value(&args, "--mode")));
    if let Some(stock) = flag_value(&args, "--stock").and_then(|s| s.parse().ok()) {
        request = request.with_featured_stock(stock);
    }
    let json = args.iter().any(|a| a == "--json");

    match flag_value(&args, "--tickets").and_then(|s| s.parse::<usize>().ok()) {
        Some(tickets) => {
            let mut route = RouteRequest::new(request, tickets);
            for layer in target_layers(&args) {
                route = route.with_target_layer(layer);
            }
            let report = engine.search(&route)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_route(&engine, &report);
            }
        }
        None => {
            let report = engine.simulate(&request)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_simulation(&engine, &request, &report);
            }
        }
    }
    Ok(())
}

fn run_ipc_loop(engine: &GachaEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e)?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::ListBanners => {
                let banners: Vec<BannerSummary> =
                    engine.master().banners().map(BannerSummary::from).collect();
                serde_json::to_value(banners)?
            }
            IpcCommand::Simulate { request } => match engine.simulate(&request) {
                Ok(report) => serde_json::to_value(report)?,
                Err(e) => {
                    write_error(&mut stdout, &e)?;
                    continue;
                }
            },
            IpcCommand::Search { request } => match engine.search(&request) {
                Ok(report) => serde_json::to_value(report)?,
                Err(e) => {
                    write_error(&mut stdout, &e)?;
                    continue;
                }
            },
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, e: &dyn std::fmt::Display) -> Result<()> {
    let err_json = serde_json::json!({ "error": e.to_string() });
    writeln!(stdout, "{err_json}")?;
    stdout.flush()?;
    Ok(())
}

fn print_simulation(engine: &GachaEngine, request: &SimulationRequest, report: &SimulationReport) {
    let catalog = &engine.master().catalog;
    println!("=== SIMULATION ===");
    println!("  banner:  {}", request.banner_id);
    println!("  seed:    {}", request.seed);
    println!("  pity:    {}", request.pity);
    println!("  model:   {:?}", report.mode());
    println!();

    match report {
        SimulationReport::Completed(r) => {
            for issue in &r.diagnostics {
                println!("  ! {issue}");
            }
            println!("--- singles ---");
            for record in &r.single_route {
                let d = &record.draw;
                println!(
                    "  {:>4} {:<5} {}{}{}",
                    record.roll,
                    d.address,
                    catalog.name_of(d.item),
                    if d.is_pity() { " [G]" } else { "" },
                    if d.reroll { " [R]" } else { "" },
                );
            }
            println!("--- ten-draws ---");
            for (i, block) in r.ten_route.iter().enumerate() {
                let names: Vec<&str> = block.draws.iter().map(|d| catalog.name_of(d.item)).collect();
                println!("  #{:<3} {}", i + 1, names.join(", "));
            }
        }
        SimulationReport::Uncompleted(r) => {
            for issue in &r.diagnostics {
                println!("  ! {issue}");
            }
            println!("  stock:   {}", r.featured_stock);
            println!("--- singles ---");
            for record in &r.single_route {
                let d = &record.draw;
                println!(
                    "  {:>4} {:<5} {}{} (stock {})",
                    record.roll,
                    d.address,
                    catalog.name_of(d.item),
                    if d.reroll { " [R]" } else { "" },
                    record.stock_left,
                );
            }
            println!("--- ten-pull cycles ---");
            for cycle in &r.ten_pull_cycles {
                println!(
                    "  cycle {:>2}: {} featured, {} values, next pity {}",
                    cycle.cycle,
                    cycle.featured_count,
                    cycle.consumed(),
                    cycle.next.pity
                );
            }
            println!("--- featured after n singles + ten-pull ---");
            for (n, count) in &r.expected_featured {
                println!("  {n:>2}: {count}");
            }
        }
    }
}

fn print_route(engine: &GachaEngine, report: &RouteReport) {
    let catalog = &engine.master().catalog;
    println!("=== ROUTE SEARCH ===");
    println!("  banner:  {}", report.banner_id);
    println!("  budget:  {}", report.budget);
    let Some(outcome) = &report.outcome else {
        println!("  no route found");
        return;
    };
    println!("  tickets: {}", outcome.tickets);
    println!("  ubers:   {}", outcome.ubers);
    println!("  legends: {}", outcome.legends);
    if !outcome.layer_hits.is_empty() {
        println!("  targets: {:?}", outcome.layer_hits);
    }
    println!();
    for event in &outcome.path {
        let names: Vec<String> = event
            .items()
            .iter()
            .map(|i| {
                let mut name = catalog.name_of(i.item).to_string();
                if i.guaranteed {
                    name.push_str(" [G]");
                }
                name
            })
            .collect();
        let kind = match event {
            PathEvent::Single { .. } => "single",
            PathEvent::Ten { .. } => "ten",
        };
        println!("  {:<5} {:<6} {}", event.address(), kind, names.join(", "));
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_mode(value: Option<&str>) -> ModelMode {
    match value {
        Some("completed") => ModelMode::Completed,
        Some("uncompleted") => ModelMode::Uncompleted,
        Some("auto") | None => ModelMode::Auto,
        Some(other) => {
            log::warn!("Unknown mode '{other}', using auto");
            ModelMode::Auto
        }
    }
}

/// Every `--target a,b,c` occurrence, in order, is one priority layer.
fn target_layers(args: &[String]) -> Vec<Vec<ItemId>> {
    args.windows(2)
        .filter(|w| w[0] == "--target")
        .map(|w| w[1].split(',').filter_map(|id| id.trim().parse().ok()).collect())
        .collect()
}
