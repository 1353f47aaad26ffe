//! Net casting.

use pond_core::{Fish, FishId, FishStatus};
use rand::Rng;
use serde::Serialize;

/// Fish closer than this to the cast point are candidates.
pub const NET_RADIUS: f64 = 15.0;
/// Chance each fish in range is actually caught.
pub const CATCH_PROBABILITY: f64 = 0.75;
/// Time between the cast and the net coming up.
pub const NET_RESOLVE_MS: i64 = 1_000;

/// Net visual state; `active` while a cast is in flight.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NetState {
    pub active: bool,
    pub x: f64,
    pub y: f64,
}

/// Active fish within [`NET_RADIUS`] of `(x, y)` that win the catch roll, in pond order.
pub fn net_candidates<R: Rng + ?Sized>(fishes: &[Fish], x: f64, y: f64, rng: &mut R) -> Vec<FishId> {
    fishes
        .iter()
        .filter(|f| f.is_active() && f.distance_to(x, y) < NET_RADIUS)
        .filter(|_| rng.gen_bool(CATCH_PROBABILITY))
        .map(|f| f.id.clone())
        .collect()
}

/// Status a fish returns to the pond with.
pub fn release_status(fish: &Fish) -> FishStatus {
    if fish.weight >= fish.species.species().target_weight_g {
        FishStatus::Adult
    } else {
        FishStatus::Growing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pond_core::SpeciesId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fish_at(seed: u64, x: f64, y: f64) -> Fish {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut f = Fish::spawn(SpeciesId::Hailu, now, &mut rng, false);
        f.x = x;
        f.y = y;
        f
    }

    #[test]
    fn only_fish_in_range_are_candidates() {
        let fishes = vec![fish_at(1, 50.0, 50.0), fish_at(2, 90.0, 90.0)];
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let c = net_candidates(&fishes, 55.0, 55.0, &mut rng);
            assert!(c.len() <= 1);
            assert!(c.iter().all(|id| *id == fishes[0].id));
        }
    }

    #[test]
    fn roughly_three_in_four_are_caught() {
        let fishes: Vec<_> = (0..400).map(|i| fish_at(i, 50.0, 50.0)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let n = net_candidates(&fishes, 50.0, 50.0, &mut rng).len();
        assert!((250..350).contains(&n), "caught {n}");
    }

    #[test]
    fn fish_exactly_on_the_rim_escape() {
        let rim = vec![fish_at(4, 50.0 + NET_RADIUS, 50.0)];
        let inside = vec![fish_at(4, 50.0 + NET_RADIUS - 0.01, 50.0)];
        let mut hits = 0;
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            assert!(net_candidates(&rim, 50.0, 50.0, &mut rng).is_empty());
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            hits += net_candidates(&inside, 50.0, 50.0, &mut rng).len();
        }
        assert!(hits > 0);
    }

    #[test]
    fn caught_and_dead_fish_are_ignored() {
        let mut caught = fish_at(1, 50.0, 50.0);
        caught.status = FishStatus::Caught;
        let mut dead = fish_at(2, 50.0, 50.0);
        dead.status = FishStatus::Dead;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(net_candidates(&[caught, dead], 50.0, 50.0, &mut rng).is_empty());
    }

    #[test]
    fn release_status_uses_species_target() {
        let mut f = fish_at(3, 0.0, 0.0);
        f.weight = 900.0;
        // Sea bass target is 950g.
        assert_eq!(release_status(&f), FishStatus::Growing);
        f.weight = 950.0;
        assert_eq!(release_status(&f), FishStatus::Adult);
    }
}
