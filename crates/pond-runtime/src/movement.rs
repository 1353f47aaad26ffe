//! Wandering and chasing on the 100x100 pond plane.

use pond_core::{Fish, POND_SIZE, SAFE_X, SAFE_Y};
use rand::Rng;

/// A wandering fish within this distance of its target picks a new one.
pub const ARRIVAL_RADIUS: f64 = 3.0;
/// Speed multiplier while chasing a pellet.
pub const CHASE_SPEED_FACTOR: f64 = 3.0;
const TILT_DAMPING: f64 = 0.3;

/// Random point in the safe band.
pub fn wander_target<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    (rng.gen_range(SAFE_X.0..SAFE_X.1), rng.gen_range(SAFE_Y.0..SAFE_Y.1))
}

/// Moves `fish` one step of `step` ticks.
///
/// With `chase` set the fish heads for that point at chase speed; otherwise it
/// wanders toward its own target and picks a new one on arrival.
pub fn steer<R: Rng + ?Sized>(fish: &mut Fish, chase: Option<(f64, f64)>, step: f64, rng: &mut R) {
    if let Some((px, py)) = chase {
        fish.target_x = px;
        fish.target_y = py;
    }
    let dx = fish.target_x - fish.x;
    let dy = fish.target_y - fish.y;
    let dist = dx.hypot(dy);

    if chase.is_none() && dist < ARRIVAL_RADIUS {
        let (tx, ty) = wander_target(rng);
        fish.target_x = tx;
        fish.target_y = ty;
        return;
    }
    if dist <= f64::EPSILON {
        return;
    }

    let speed = match chase {
        Some(_) => fish.speed * CHASE_SPEED_FACTOR,
        None => fish.speed,
    };
    let travel = (speed * step).min(dist);
    let mx = dx / dist * travel;
    let my = dy / dist * travel;
    fish.x = (fish.x + mx).clamp(0.0, POND_SIZE);
    fish.y = (fish.y + my).clamp(0.0, POND_SIZE);
    if mx > 0.0 {
        fish.direction = 1;
    } else if mx < 0.0 {
        fish.direction = -1;
    }
    fish.angle = my.atan2(mx.abs()).to_degrees() * TILT_DAMPING;
}
