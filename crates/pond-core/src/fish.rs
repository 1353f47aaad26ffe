//! Per-fish record and status state machine.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{random_base36, to_base36, SpeciesId};

/// Automatic growth per day, also the weight a single feeding is worth.
pub const DAILY_GROWTH_G: f64 = 60.0;
/// Weight at which a fish becomes adult.
pub const MATURE_WEIGHT_G: f64 = 800.0;
/// Weight a baby must exceed to count as growing.
pub const BABY_WEIGHT_LIMIT_G: f64 = 100.0;
/// Hunger of a freshly fed fish.
pub const MAX_HUNGER: f64 = 100.0;
/// Side length of the square pond.
pub const POND_SIZE: f64 = 100.0;
/// Horizontal band fish pick wander targets from.
pub const SAFE_X: (f64, f64) = (15.0, 85.0);
/// Vertical band fish pick wander targets from.
pub const SAFE_Y: (f64, f64) = (25.0, 75.0);

/// Identifier of a transient food pellet.
pub type PelletId = u64;

/// Stable fish identifier, e.g. `fish_lx2k9a_4h1c0pz7q`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FishId(pub String);

impl fmt::Display for FishId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a fish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FishStatus {
    Baby,
    Growing,
    Adult,
    /// Not fed for more than the hunger threshold (neglect policy only).
    Hungry,
    /// Starved; purged from the pond on the following tick.
    Dead,
    /// Held in the capture slot.
    Caught,
}

impl FishStatus {
    /// Status a well-fed fish of this weight has, ignoring stickiness.
    pub fn for_weight(weight: f64) -> Self {
        if weight >= MATURE_WEIGHT_G {
            FishStatus::Adult
        } else if weight > BABY_WEIGHT_LIMIT_G {
            FishStatus::Growing
        } else {
            FishStatus::Baby
        }
    }
}

/// Growth percentage toward maturity, clamped to [0, 100].
pub fn growth_percent(weight: f64) -> f64 {
    (weight / MATURE_WEIGHT_G * 100.0).clamp(0.0, 100.0)
}

fn default_initial_weight() -> f64 {
    75.0
}

fn full_hunger() -> f64 {
    MAX_HUNGER
}

fn default_direction() -> i8 {
    1
}

/// A living (or caught) fish.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fish {
    pub id: FishId,
    #[serde(rename = "type")]
    pub species: SpeciesId,
    pub name: String,
    pub status: FishStatus,
    /// Current weight in grams.
    pub weight: f64,
    /// Weight at creation, drawn once in [50, 100).
    #[serde(default = "default_initial_weight")]
    pub initial_weight: f64,
    /// Seed for the per-fish growth variance; drawn once at creation.
    #[serde(default)]
    pub growth_seed: u64,
    /// Sum of the random part of every feeding gain.
    #[serde(default)]
    pub feed_jitter: f64,
    /// Percentage toward maturity.
    #[serde(default)]
    pub growth: f64,
    #[serde(default = "full_hunger")]
    pub hunger: f64,
    /// Number of feedings received.
    #[serde(rename = "foodEaten", default)]
    pub feed_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_fed_at: Option<DateTime<Utc>>,
    /// Added by scanning an in-store code rather than as a starter gift.
    #[serde(rename = "fromQRCode", default)]
    pub from_qr_code: bool,
    pub x: f64,
    pub y: f64,
    pub target_x: f64,
    pub target_y: f64,
    /// Facing: 1 = right, -1 = left.
    #[serde(default = "default_direction")]
    pub direction: i8,
    /// Distance covered per 100ms tick while wandering.
    pub speed: f64,
    /// Presentation tilt in degrees.
    #[serde(default)]
    pub angle: f64,
    /// Pellet this fish is currently chasing.
    #[serde(skip)]
    pub chasing: Option<PelletId>,
}

impl Fish {
    /// Creates a baby fish at a random spot in the safe band of the pond.
    pub fn spawn<R: Rng + ?Sized>(
        species: SpeciesId,
        now: DateTime<Utc>,
        rng: &mut R,
        from_qr_code: bool,
    ) -> Self {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = FishId(format!("fish_{}_{}", to_base36(millis), random_base36(rng, 9)));
        let initial_weight = rng.gen_range(50.0..100.0);
        Self {
            id,
            species,
            name: species.species().name.to_string(),
            status: FishStatus::Baby,
            weight: initial_weight,
            initial_weight,
            growth_seed: rng.gen(),
            feed_jitter: 0.0,
            growth: growth_percent(initial_weight),
            hunger: MAX_HUNGER,
            feed_count: 0,
            created_at: now,
            last_fed_at: Some(now),
            from_qr_code,
            x: rng.gen_range(SAFE_X.0..SAFE_X.1),
            y: rng.gen_range(SAFE_Y.0..SAFE_Y.1),
            target_x: rng.gen_range(SAFE_X.0..SAFE_X.1),
            target_y: rng.gen_range(SAFE_Y.0..SAFE_Y.1),
            direction: 1,
            speed: rng.gen_range(0.1..0.3),
            angle: 0.0,
            chasing: None,
        }
    }

    /// Last feeding, falling back to creation for fish never fed.
    pub fn last_fed(&self) -> DateTime<Utc> {
        self.last_fed_at.unwrap_or(self.created_at)
    }

    /// True for fish that swim, grow and eat: neither dead nor caught.
    pub fn is_active(&self) -> bool {
        !matches!(self.status, FishStatus::Dead | FishStatus::Caught)
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn spawn_is_a_baby_in_the_safe_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let f = Fish::spawn(SpeciesId::Basha, now(), &mut rng, false);
            assert_eq!(f.status, FishStatus::Baby);
            assert!((50.0..100.0).contains(&f.weight));
            assert_eq!(f.weight, f.initial_weight);
            assert!((SAFE_X.0..SAFE_X.1).contains(&f.x));
            assert!((SAFE_Y.0..SAFE_Y.1).contains(&f.y));
            assert!((0.1..0.3).contains(&f.speed));
            assert_eq!(f.name, "Basha");
            assert!(f.id.0.starts_with("fish_"));
        }
    }

    #[test]
    fn spawned_ids_differ() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = Fish::spawn(SpeciesId::Qingjiang, now(), &mut rng, false);
        let b = Fish::spawn(SpeciesId::Qingjiang, now(), &mut rng, false);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(FishStatus::for_weight(100.0), FishStatus::Baby);
        assert_eq!(FishStatus::for_weight(100.5), FishStatus::Growing);
        assert_eq!(FishStatus::for_weight(799.9), FishStatus::Growing);
        assert_eq!(FishStatus::for_weight(800.0), FishStatus::Adult);
    }

    #[test]
    fn wire_names_match_snapshot_format() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let f = Fish::spawn(SpeciesId::Hailu, now(), &mut rng, true);
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["type"], "hailu");
        assert_eq!(v["status"], "baby");
        assert_eq!(v["foodEaten"], 0);
        assert_eq!(v["fromQRCode"], true);
        assert!(v.get("targetX").is_some());
        assert!(v.get("chasing").is_none());
    }

    #[test]
    fn legacy_record_without_growth_facts_loads() {
        let json = r#"{
            "id": "fish_1700000000000_abc123def",
            "type": "qingjiang",
            "name": "Qingjiang",
            "status": "growing",
            "weight": 240.5,
            "hunger": 100,
            "growth": 30,
            "foodEaten": 2,
            "createdAt": "2024-05-01T12:00:00Z",
            "x": 40, "y": 50, "targetX": 60, "targetY": 30,
            "direction": -1, "speed": 0.2, "angle": 0
        }"#;
        let f: Fish = serde_json::from_str(json).unwrap();
        assert_eq!(f.status, FishStatus::Growing);
        assert_eq!(f.feed_count, 2);
        assert_eq!(f.initial_weight, 75.0);
        assert_eq!(f.last_fed(), f.created_at);
        assert_eq!(f.direction, -1);
    }

    proptest! {
        #[test]
        fn growth_is_clamped_ratio(w in -100.0f64..5_000.0) {
            let g = growth_percent(w);
            prop_assert!((0.0..=100.0).contains(&g));
            if (0.0..=MATURE_WEIGHT_G).contains(&w) {
                prop_assert!((g - w / MATURE_WEIGHT_G * 100.0).abs() < 1e-9);
            }
        }
    }
}
