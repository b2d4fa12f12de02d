#![deny(warnings)]

//! Headless CLI: plays a session for a number of ticks and prints KPIs.

use anyhow::{bail, Result};
use persistence::{JsonFileStore, MemoryStore, SnapshotStore, SqliteStore};
use rust_decimal::Decimal;
use sim_core::catalog::RESOURCE_PACKS;
use sim_core::{validate_snapshot, RawMaterial, SimConfig, UpgradeKind};
use sim_runtime::{Level, Session};
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    ticks: Option<u64>,
    seed: Option<u64>,
    config: Option<String>,
    save: Option<String>,
    db: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--ticks" => args.ticks = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--config" => args.config = it.next(),
            "--save" => args.save = it.next(),
            "--db" => args.db = it.next(),
            _ => {}
        }
    }
    if args.save.is_some() && args.db.is_some() {
        bail!("--save and --db are mutually exclusive");
    }
    Ok(args)
}

/// Figures printed at the end of a run.
struct Kpi {
    ticks: u64,
    bricks_made: f64,
    funds: Decimal,
    stage: String,
    demand: f64,
    event: Option<String>,
    projects: u32,
    errors: usize,
}

/// One tick of a simple greedy player, followed by the tick itself.
fn autoplay<S: SnapshotStore>(session: &mut Session<S>) {
    let ids: Vec<u32> = session.offered_opportunities().iter().map(|o| o.id).collect();
    for id in ids {
        let _ = session.claim_opportunity(id);
    }

    let (clay_cost, water_cost) = session.state().costs();
    for (material, cost) in [(RawMaterial::Clay, clay_cost), (RawMaterial::Water, water_cost)] {
        if session.state().ledger.raw(material) < cost * 5.0 {
            let cheapest = RESOURCE_PACKS
                .iter()
                .filter(|p| p.material == material)
                .min_by_key(|p| p.price);
            if let Some(pack) = cheapest {
                if session.state().ledger.funds >= Decimal::from(pack.price) {
                    let _ = session.buy_pack(pack);
                }
            }
        }
    }

    let ledger = &session.state().ledger;
    if ledger.clay >= clay_cost && ledger.water >= water_cost {
        let _ = session.make_brick();
    }

    let stock = session.state().ledger.bricks.floor();
    if stock >= 1.0 {
        let _ = session.sell(stock as u64);
    }

    let upgrades = &session.state().upgrades;
    let funds = session.state().ledger.funds;
    let next = UpgradeKind::ALL
        .into_iter()
        .filter(|k| upgrades.get(*k).unlocked)
        .map(|k| (k, sim_econ::upgrade_price(upgrades.get(k))))
        .filter(|(_, price)| *price <= funds)
        .min_by_key(|(_, price)| *price);
    if let Some((kind, _)) = next {
        let _ = session.buy_upgrade(kind);
    }

    session.step();
}

fn play<S: SnapshotStore>(cfg: SimConfig, store: S, ticks: u64) -> Result<Kpi> {
    let mut session = Session::resume(cfg, store)?;
    let mut errors = 0;
    for _ in 0..ticks {
        autoplay(&mut session);
        errors += session
            .drain_notifications()
            .iter()
            .filter(|n| n.level == Level::Error)
            .count();
    }
    validate_snapshot(&session.snapshot())?;

    let state = session.state();
    let kpi = Kpi {
        ticks: session.tick(),
        bricks_made: state.ledger.bricks_made_total,
        funds: state.ledger.funds,
        stage: state.stage().to_string(),
        demand: state.market.demand_level,
        event: state.event.active.then(|| state.event.name.clone()),
        projects: state.projects_claimed,
        errors,
    };
    session.end()?;
    Ok(kpi)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(TraceLevel::DEBUG)
        .init();

    let args = parse_args()?;
    info!(?args, "starting CLI");

    let mut cfg = match &args.config {
        Some(path) => sim_runtime::load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    let ticks = args.ticks.unwrap_or(600);

    let kpi = if let Some(path) = &args.save {
        play(cfg, JsonFileStore::new(path), ticks)?
    } else if let Some(url) = &args.db {
        play(cfg, SqliteStore::open(url, "default")?, ticks)?
    } else {
        play(cfg, MemoryStore::new(), ticks)?
    };

    println!(
        "KPI | ticks: {} | bricks made: {:.0} | funds: {} GNF | stage: {} | demand: {:.0} | event: {} | projects claimed: {} | rejected actions: {}",
        kpi.ticks,
        kpi.bricks_made,
        kpi.funds,
        kpi.stage,
        kpi.demand,
        kpi.event.as_deref().unwrap_or("none"),
        kpi.projects,
        kpi.errors
    );

    Ok(())
}
