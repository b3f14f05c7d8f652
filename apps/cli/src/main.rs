#![deny(warnings)]

//! Headless CLI running a scripted Forux Idle session: a greedy bot taps,
//! buys whatever upgrade it can afford, catches meteors, and cashes out at
//! the trading station, then prints a KPI summary.

use anyhow::Result;
use idle_core::{Catalog, GameConfig, UpgradeId};
use idle_runtime::{GameSession, MeteorPhase};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    minutes: u64,
    seed: Option<u64>,
    taps_per_sec: u32,
    snapshot_json: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        minutes: 5,
        seed: None,
        taps_per_sec: 3,
        snapshot_json: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--minutes" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.minutes = v;
                }
            }
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--taps-per-sec" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.taps_per_sec = v;
                }
            }
            "--snapshot-json" => args.snapshot_json = true,
            _ => {}
        }
    }
    args
}

/// Cheapest upgrade the wallet can currently cover, if any.
fn cheapest_affordable(session: &GameSession, ids: &[UpgradeId]) -> Option<UpgradeId> {
    let balance = session.ledger().wallet().dilithium;
    ids.iter()
        .filter_map(|id| session.ledger().current_cost(id).map(|cost| (cost, id)))
        .filter(|(cost, _)| *cost <= balance)
        .min_by_key(|(cost, _)| *cost)
        .map(|(_, id)| id.clone())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        minutes = args.minutes,
        seed = ?args.seed,
        taps_per_sec = args.taps_per_sec,
        git_sha = env!("GIT_SHA"),
        "starting scripted session"
    );

    let catalog = Catalog::standard();
    let ids: Vec<UpgradeId> = catalog.upgrades.iter().map(|d| d.id.clone()).collect();
    let mut config = GameConfig::default();
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    let trade_rate = config.trade_rate;
    let mut session = GameSession::new(catalog, config)?;

    let mut signals = 0usize;
    for sec in 1..=args.minutes * 60 {
        session.advance(Duration::from_secs(sec));
        for _ in 0..args.taps_per_sec {
            session.tap();
        }
        while let Some(id) = cheapest_affordable(&session, &ids) {
            session.purchase(&id)?;
        }
        if matches!(session.meteor_phase(), MeteorPhase::Traveling { .. }) {
            // Let the meteor travel a few frames, then catch it.
            for _ in 0..12 {
                session.frame();
            }
            session.collect_meteor();
        }
        signals += session.drain_signals().len();
    }

    // Cash out whole lots at the trading station.
    let balance = session.ledger().wallet().dilithium;
    let lot = balance - balance % trade_rate;
    if lot > 0 {
        let receipt = session.trade(lot)?;
        info!(
            dilithium = receipt.dilithium_spent,
            coins = receipt.coins_received,
            "cashed out"
        );
        signals += session.drain_signals().len();
    }

    let snap = session.snapshot();
    session.dispose();

    if args.snapshot_json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
        return Ok(());
    }

    let levels: u32 = snap.upgrades.iter().map(|u| u.level).sum();
    println!(
        "Session OK | upgrades owned: {} | signals dispatched: {}",
        levels, signals
    );
    println!(
        "KPI | secs: {} | taps: {} | dilithium: {} | coins: {} | click power: {} | income: {}/s | meteors: {} caught / {} missed",
        snap.elapsed.as_secs(),
        snap.taps,
        snap.dilithium,
        snap.coins,
        snap.total_click_power,
        snap.total_passive_income,
        snap.meteors_caught,
        snap.meteors_missed
    );

    Ok(())
}
