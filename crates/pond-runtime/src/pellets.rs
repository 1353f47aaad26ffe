//! Food pellets dropped by feed-all under the pellet-chase policy.

use pond_core::{Fish, FishId, PelletId, SAFE_X};
use rand::Rng;
use serde::Serialize;

/// Depth gained per 100ms tick.
pub const PELLET_FALL_SPEED: f64 = 0.5;
/// Band the resting depth is drawn from.
pub const PELLET_REST_DEPTH: (f64, f64) = (40.0, 85.0);
/// Offset of the mouth from the fish centre, along its facing.
pub const MOUTH_OFFSET: f64 = 3.0;
/// A mouth this close to a pellet eats it.
pub const EAT_RADIUS: f64 = 4.0;
/// Delay before an eaten pellet disappears.
pub const EATEN_LINGER_MS: i64 = 500;
/// Delay before a pellet resting uneaten on the bottom disappears.
pub const LANDED_LINGER_MS: i64 = 3_000;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPellet {
    pub id: PelletId,
    pub x: f64,
    /// Current depth; 0 is the surface.
    pub y: f64,
    pub target_y: f64,
    pub fall_speed: f64,
    pub landed: bool,
    pub eaten: bool,
    pub eaten_by: Option<FishId>,
}

impl FoodPellet {
    /// Drops a pellet at the surface above a random point in the safe band.
    pub fn spawn<R: Rng + ?Sized>(id: PelletId, rng: &mut R) -> Self {
        Self {
            id,
            x: rng.gen_range(SAFE_X.0..SAFE_X.1),
            y: 0.0,
            target_y: rng.gen_range(PELLET_REST_DEPTH.0..PELLET_REST_DEPTH.1),
            fall_speed: PELLET_FALL_SPEED,
            landed: false,
            eaten: false,
            eaten_by: None,
        }
    }

    /// Sinks the pellet by `step` ticks. Returns true on the step it lands.
    pub fn fall(&mut self, step: f64) -> bool {
        if self.landed || self.eaten {
            return false;
        }
        self.y = (self.y + self.fall_speed * step).min(self.target_y);
        if self.y >= self.target_y {
            self.landed = true;
            return true;
        }
        false
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Mouth position of a fish.
pub fn mouth(fish: &Fish) -> (f64, f64) {
    (fish.x + f64::from(fish.direction) * MOUTH_OFFSET, fish.y)
}

/// Index of the first active fish whose mouth reaches `pellet`.
pub fn first_eater(fishes: &[Fish], pellet: &FoodPellet) -> Option<usize> {
    if pellet.eaten {
        return None;
    }
    fishes.iter().position(|f| {
        let (mx, my) = mouth(f);
        f.is_active() && (mx - pellet.x).hypot(my - pellet.y) <= EAT_RADIUS
    })
}

/// Uneaten pellet closest to `(x, y)`.
pub fn nearest_uneaten(pellets: &[FoodPellet], x: f64, y: f64) -> Option<PelletId> {
    pellets
        .iter()
        .filter(|p| !p.eaten)
        .min_by(|a, b| {
            let da = (a.x - x).hypot(a.y - y);
            let db = (b.x - x).hypot(b.y - y);
            da.total_cmp(&db)
        })
        .map(|p| p.id)
}
