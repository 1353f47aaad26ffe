use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use persistence::MemoryStore;
use pond_core::{FeedMode, PondConfig, SpeciesId};
use pond_runtime::PondSession;

fn busy_pond() -> PondSession {
    let config = PondConfig {
        feed_mode: FeedMode::Unlimited,
        ..PondConfig::default()
    };
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut session = PondSession::start(config, Box::new(MemoryStore::new()), now).unwrap();
    for species in SpeciesId::ALL.iter().cycle().take(50) {
        session.add_fish(*species, false);
    }
    session
}

fn bench_ticks(c: &mut Criterion) {
    let mut session = busy_pond();
    c.bench_function("pond_second", |b| {
        b.iter(|| session.advance(Duration::seconds(1)))
    });

    let mut feeding = busy_pond();
    c.bench_function("pond_pellet_round", |b| {
        b.iter(|| {
            let _ = feeding.feed_all();
            feeding.advance(Duration::seconds(20));
        })
    });

    let mut idle = busy_pond();
    c.bench_function("pond_fast_forward_day", |b| {
        b.iter(|| idle.advance(Duration::days(1)))
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
