#![deny(warnings)]

//! Core domain models and invariants for the fish pond.
//!
//! This crate defines the species catalog, the fish and coupon records,
//! session configuration, and the error taxonomy shared by every action, with
//! validation helpers that guard the basic invariants of loaded data.

mod catalog;
mod fish;

pub use catalog::*;
pub use fish::*;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Valid background theme ids.
pub const BACKGROUNDS: std::ops::RangeInclusive<u8> = 1..=4;

/// What happens to neglected fish, fixed per deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// Hunger is disabled, fish never die, and feeding everyone drops a
    /// pellet that the fastest fish eats.
    PelletChase,
    /// Hunger decays after three days without food and fish die after
    /// fifteen; feeding everyone feeds each fish directly.
    Neglect,
}

/// Whether feeding draws on the daily allowance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    Metered,
    /// Feeding is free; used for demos and testing.
    Unlimited,
}

/// Session configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PondConfig {
    /// Logical tick length in milliseconds (default: 100).
    pub tick_ms: u32,
    /// Seed for the session RNG.
    pub rng_seed: u64,
    pub lifecycle: LifecyclePolicy,
    pub feed_mode: FeedMode,
    /// Feedings granted each calendar day.
    pub daily_feed_allowance: u32,
    /// Feedings granted per share.
    pub share_bonus: u32,
    /// Species gifted to a player with an empty pond.
    pub starter_species: SpeciesId,
    /// Kinematic substeps simulated per `advance`; longer spans fast-forward.
    pub max_substeps: u32,
    /// Offset of the player's wall clock from UTC, in minutes. Night and the
    /// daily feed reset follow this clock.
    pub utc_offset_minutes: i32,
}

impl Default for PondConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            rng_seed: 42,
            lifecycle: LifecyclePolicy::PelletChase,
            feed_mode: FeedMode::Metered,
            daily_feed_allowance: 10,
            share_bonus: 3,
            starter_species: SpeciesId::Qingjiang,
            max_substeps: 600,
            utc_offset_minutes: 0,
        }
    }
}

impl PondConfig {
    /// The player's wall-clock offset; UTC when the configured value is out of range.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Kind of a redeemable coupon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    GrilledFish,
}

/// A redeemable token minted from a harvested fish.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub fish_id: FishId,
    pub fish_name: String,
    /// Weight of the fish at harvest, in grams.
    pub fish_weight: f64,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Face value in currency units.
    pub value: Decimal,
    /// Redemption code shown to store staff.
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Discriminant of [`PondError`], for callers that only branch on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InsufficientFeed,
}

/// Failure of a session action. A failed action leaves state unchanged.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PondError {
    /// Referenced fish, species or coupon does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Action attempted in the wrong state, e.g. harvesting a young fish.
    #[error("{0}")]
    InvalidState(String),
    /// The feed economy is exhausted.
    #[error("not enough feed; share with a friend to earn more")]
    InsufficientFeed,
}

impl PondError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PondError::NotFound(_) => ErrorKind::NotFound,
            PondError::InvalidState(_) => ErrorKind::InvalidState,
            PondError::InsufficientFeed => ErrorKind::InsufficientFeed,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        PondError::InvalidState(msg.into())
    }
}

/// Success flag plus human-readable message, the shape UI callers consume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionReport {
    pub success: bool,
    pub message: String,
    pub kind: Option<ErrorKind>,
}

impl ActionReport {
    /// Builds a report from an action result, describing successes with `describe`.
    pub fn from_result<T>(res: &Result<T, PondError>, describe: impl FnOnce(&T) -> String) -> Self {
        match res {
            Ok(v) => Self {
                success: true,
                message: describe(v),
                kind: None,
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
                kind: Some(e.kind()),
            },
        }
    }
}

/// Validation errors for loaded or configured data.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("non-finite numeric value encountered")]
    NonFinite,
    #[error("weight must be > 0")]
    NonPositiveWeight,
    #[error("hunger {0} outside [0, 100]")]
    HungerOutOfRange(f64),
    #[error("position outside the pond")]
    OutOfPond,
    #[error("direction must be 1 or -1, got {0}")]
    InvalidDirection(i8),
    #[error("fish id must not be empty")]
    EmptyId,
    #[error("background {0} is not in 1..=4")]
    InvalidBackground(u8),
    #[error("tick length must be > 0")]
    ZeroTick,
    #[error("utc offset {0} minutes is not within a day")]
    UtcOffset(i32),
}

/// Validate a fish record.
pub fn validate_fish(f: &Fish) -> Result<(), ValidationError> {
    if f.id.0.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    let numbers = [
        f.weight,
        f.initial_weight,
        f.feed_jitter,
        f.growth,
        f.hunger,
        f.x,
        f.y,
        f.target_x,
        f.target_y,
        f.speed,
        f.angle,
    ];
    if numbers.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    if f.weight <= 0.0 || f.initial_weight <= 0.0 {
        return Err(ValidationError::NonPositiveWeight);
    }
    if !(0.0..=MAX_HUNGER).contains(&f.hunger) {
        return Err(ValidationError::HungerOutOfRange(f.hunger));
    }
    let inside = |v: f64| (0.0..=POND_SIZE).contains(&v);
    if !(inside(f.x) && inside(f.y) && inside(f.target_x) && inside(f.target_y)) {
        return Err(ValidationError::OutOfPond);
    }
    if f.direction != 1 && f.direction != -1 {
        return Err(ValidationError::InvalidDirection(f.direction));
    }
    Ok(())
}

/// Validate a background theme id.
pub fn validate_background(id: u8) -> Result<(), ValidationError> {
    if BACKGROUNDS.contains(&id) {
        Ok(())
    } else {
        Err(ValidationError::InvalidBackground(id))
    }
}

/// Validate session configuration.
pub fn validate_config(c: &PondConfig) -> Result<(), ValidationError> {
    if c.tick_ms == 0 {
        return Err(ValidationError::ZeroTick);
    }
    if c.utc_offset_minutes.abs() >= 24 * 60 {
        return Err(ValidationError::UtcOffset(c.utc_offset_minutes));
    }
    Ok(())
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Lowercase base-36 rendering of `n`.
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// `len` random lowercase base-36 characters.
pub fn random_base36<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
