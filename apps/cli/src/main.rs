#![deny(warnings)]

//! Headless CLI: opens a pond, optionally tends it, advances the clock and
//! prints KPIs.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use persistence::FileStore;
use pond_core::{ActionReport, FishId, FishStatus, PondConfig, SpeciesId};
use pond_runtime::PondSession;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    store: String,
    add: Option<String>,
    hours: u32,
    feed: bool,
    share: bool,
    harvest: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        store: ".pond".to_string(),
        add: None,
        hours: 0,
        feed: false,
        share: false,
        harvest: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next(),
            "--store" => {
                if let Some(dir) = it.next() {
                    args.store = dir;
                }
            }
            "--add" => args.add = it.next(),
            "--hours" => args.hours = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--feed" => args.feed = true,
            "--share" => args.share = true,
            "--harvest" => args.harvest = true,
            _ => {}
        }
    }
    args
}

fn load_config(path: Option<&str>) -> Result<PondConfig> {
    let Some(path) = path else {
        return Ok(PondConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing config {path}"))
}

fn active_ids(session: &PondSession, adults_only: bool) -> Vec<FishId> {
    session
        .fishes()
        .iter()
        .filter(|f| f.is_active() && (!adults_only || f.status == FishStatus::Adult))
        .map(|f| f.id.clone())
        .collect()
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(config = ?args.config, store = %args.store, hours = args.hours, "starting CLI");

    let config = load_config(args.config.as_deref())?;
    let store = FileStore::new(&args.store);
    let mut session = PondSession::start(config, Box::new(store), Utc::now())?;

    if let Some(name) = args.add.as_deref() {
        let species: SpeciesId = name.parse()?;
        let id = session.add_fish(species, true);
        println!("Added a {} ({id})", species.species().name);
    }
    if args.share {
        let bonus = session.share_to_friend();
        println!("Shared with a friend: +{bonus} feed");
    }
    if args.feed {
        for id in active_ids(&session, false) {
            let res = session.feed_fish(&id);
            let report = ActionReport::from_result(&res, |r| r.message());
            println!("{}", report.message);
            if !report.success {
                break;
            }
        }
    }

    for _ in 0..args.hours {
        session.advance(Duration::hours(1));
    }

    if args.harvest {
        for id in active_ids(&session, true) {
            let res = session.harvest_fish(&id);
            let report = ActionReport::from_result(&res, |c| {
                format!("Harvested {} ({:.0}g): coupon {} worth {}", c.fish_name, c.fish_weight, c.code, c.value)
            });
            println!("{}", report.message);
        }
    }

    println!(
        "Pond OK | fish: {} | adults: {} | value: {} | feed: {} | coupons: {} | night: {}",
        session.fishes().len(),
        session.adult_fish_count(),
        session.total_fish_value(),
        session.total_feed_available(),
        session.coupons().iter().filter(|c| !c.used).count(),
        session.is_night()
    );
    for fish in session.fishes() {
        println!(
            "  {} | {:?} | {:.0}g | growth {:.0}% | hunger {:.0}",
            fish.name, fish.status, fish.weight, fish.growth, fish.hunger
        );
    }

    Ok(())
}
