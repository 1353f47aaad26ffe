//! Weight, hunger and status recomputation.
//!
//! Weight is a pure function of facts recorded on the fish: initial weight,
//! time since creation, feeding count, and the accumulated random part of
//! each feeding. Recomputing it every tick therefore never double-counts.

use chrono::{DateTime, Utc};
use pond_core::{
    growth_percent, Fish, FishStatus, LifecyclePolicy, BABY_WEIGHT_LIMIT_G, DAILY_GROWTH_G,
    MATURE_WEIGHT_G, MAX_HUNGER,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Days without food after which a fish turns hungry (neglect policy).
pub const HUNGRY_DAYS: f64 = 3.0;
/// Days without food after which a fish dies (neglect policy).
pub const DEAD_DAYS: f64 = 15.0;
/// Maximum deviation of one feeding from [`DAILY_GROWTH_G`].
pub const FEED_JITTER_G: f64 = 10.0;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Fractional days from `from` to `to`, never negative.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / MS_PER_DAY).max(0.0)
}

/// Per-fish multiplier on natural growth, in [0.9, 1.1], fixed by the seed.
pub fn growth_variance(seed: u64) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    0.9 + 0.2 * rng.gen::<f64>()
}

/// Weight the recorded facts imply at `now`.
pub fn expected_weight(fish: &Fish, now: DateTime<Utc>) -> f64 {
    let natural = days_between(fish.created_at, now) * DAILY_GROWTH_G * growth_variance(fish.growth_seed);
    let fed = f64::from(fish.feed_count) * DAILY_GROWTH_G;
    fish.initial_weight + natural + fed + fish.feed_jitter
}

/// Promotes by weight: adult at maturity, baby to growing past the baby limit.
/// Never demotes.
fn settle_status(fish: &mut Fish) {
    if fish.weight >= MATURE_WEIGHT_G {
        fish.status = FishStatus::Adult;
    } else if fish.status == FishStatus::Baby && fish.weight > BABY_WEIGHT_LIMIT_G {
        fish.status = FishStatus::Growing;
    }
}

/// Recomputes weight, growth, hunger and status of an active fish.
///
/// Returns the status transition, if any. Dead and caught fish are untouched.
pub fn recompute(
    fish: &mut Fish,
    now: DateTime<Utc>,
    policy: LifecyclePolicy,
) -> Option<(FishStatus, FishStatus)> {
    if !fish.is_active() {
        return None;
    }
    let before = fish.status;
    // Monotonic: legacy records may carry more weight than their facts imply.
    fish.weight = expected_weight(fish, now).max(fish.weight);
    fish.growth = growth_percent(fish.weight);

    match policy {
        LifecyclePolicy::PelletChase => {
            fish.hunger = MAX_HUNGER;
            settle_status(fish);
        }
        LifecyclePolicy::Neglect => {
            let starving = days_between(fish.last_fed(), now);
            if starving > DEAD_DAYS {
                fish.status = FishStatus::Dead;
                fish.hunger = 0.0;
            } else if starving > HUNGRY_DAYS {
                // Adults stay harvestable; only their hunger decays.
                if fish.status != FishStatus::Adult {
                    fish.status = FishStatus::Hungry;
                }
                let decay = (starving - HUNGRY_DAYS) / (DEAD_DAYS - HUNGRY_DAYS);
                fish.hunger = (MAX_HUNGER - decay * MAX_HUNGER).max(0.0);
            } else {
                fish.hunger = MAX_HUNGER;
                if fish.status == FishStatus::Hungry {
                    fish.status = FishStatus::for_weight(fish.weight);
                }
                settle_status(fish);
            }
        }
    }

    (fish.status != before).then_some((before, fish.status))
}

/// Applies one feeding at `now` and returns the weight gained.
///
/// Gain is [`DAILY_GROWTH_G`] ± [`FEED_JITTER_G`]; the random part is kept on
/// the fish so later recomputation reproduces it.
pub fn apply_feeding<R: Rng + ?Sized>(fish: &mut Fish, now: DateTime<Utc>, rng: &mut R) -> f64 {
    let jitter = rng.gen_range(-FEED_JITTER_G..FEED_JITTER_G);
    let gain = DAILY_GROWTH_G + jitter;
    fish.weight += gain;
    fish.feed_jitter += jitter;
    fish.feed_count += 1;
    fish.hunger = MAX_HUNGER;
    fish.last_fed_at = Some(now);
    fish.growth = growth_percent(fish.weight);
    if fish.status == FishStatus::Hungry {
        fish.status = FishStatus::for_weight(fish.weight);
    }
    settle_status(fish);
    gain
}
