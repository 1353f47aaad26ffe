#![deny(warnings)]

//! Feed economy and coupon ledger for the fish pond.
//!
//! This crate provides validated helpers for:
//! - The daily feed allowance and share-earned bonus feed
//! - Minting time-limited coupons from harvested fish
//! - Redeeming coupons and valuing the adult fish in a pond

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pond_core::{random_base36, to_base36, Coupon, CouponKind, FeedMode, Fish, FishStatus, PondError};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Days a coupon stays redeemable.
pub const COUPON_VALIDITY_DAYS: i64 = 7;
/// Balance reported when feeding is unmetered.
pub const UNLIMITED_FEED: u32 = 9999;

/// Errors produced by the economy helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Neither the daily allowance nor the share bonus has feed left.
    #[error("feed exhausted")]
    InsufficientFeed,
    /// Coupon was already redeemed.
    #[error("coupon {0} already used")]
    CouponUsed(String),
    /// Coupon is past its expiry.
    #[error("coupon {0} expired")]
    CouponExpired(String),
}

impl From<EconError> for PondError {
    fn from(e: EconError) -> Self {
        match e {
            EconError::InsufficientFeed => PondError::InsufficientFeed,
            other => PondError::InvalidState(other.to_string()),
        }
    }
}

/// Feed balance of a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLedger {
    /// What is left of today's allowance.
    pub feed_count: u32,
    /// Feed earned by sharing; spent before the allowance and never reset.
    pub share_bonus: u32,
    /// Calendar day the allowance was last reset.
    pub last_reset: Option<NaiveDate>,
}

impl FeedLedger {
    pub fn new(allowance: u32) -> Self {
        Self {
            feed_count: allowance,
            share_bonus: 0,
            last_reset: None,
        }
    }

    /// Total feedings that can be paid for right now.
    pub fn available(&self) -> u32 {
        self.feed_count.saturating_add(self.share_bonus)
    }

    /// Spends one feeding, drawing on the share bonus first.
    pub fn spend(&mut self) -> Result<(), EconError> {
        if self.share_bonus > 0 {
            self.share_bonus -= 1;
        } else if self.feed_count > 0 {
            self.feed_count -= 1;
        } else {
            return Err(EconError::InsufficientFeed);
        }
        Ok(())
    }

    pub fn grant_share_bonus(&mut self, amount: u32) {
        self.share_bonus = self.share_bonus.saturating_add(amount);
    }

    /// Restores the allowance when `today` differs from the last reset day.
    ///
    /// Returns whether a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate, allowance: u32) -> bool {
        if self.last_reset == Some(today) {
            return false;
        }
        debug!(%today, allowance, "daily feed allowance reset");
        self.feed_count = allowance;
        self.last_reset = Some(today);
        true
    }
}

/// Feed available under `mode`.
pub fn available_feed(ledger: &FeedLedger, mode: FeedMode) -> u32 {
    match mode {
        FeedMode::Metered => ledger.available(),
        FeedMode::Unlimited => UNLIMITED_FEED,
    }
}

/// Fails with [`EconError::InsufficientFeed`] when `mode` meters feed and none is left.
pub fn ensure_feed(ledger: &FeedLedger, mode: FeedMode) -> Result<(), EconError> {
    if available_feed(ledger, mode) == 0 {
        return Err(EconError::InsufficientFeed);
    }
    Ok(())
}

/// Charges one feeding under `mode`; unmetered feeding is free.
pub fn charge_feed(ledger: &mut FeedLedger, mode: FeedMode) -> Result<(), EconError> {
    match mode {
        FeedMode::Metered => ledger.spend(),
        FeedMode::Unlimited => Ok(()),
    }
}

/// Redemption code: `GF`, the base-36 timestamp, and four random characters, uppercase.
///
/// Unique with overwhelming probability, not by construction.
pub fn coupon_code<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    format!("GF{}{}", to_base36(millis), random_base36(rng, 4)).to_ascii_uppercase()
}

/// Mints a grilled-fish coupon for `fish`, valid for [`COUPON_VALIDITY_DAYS`].
pub fn mint_coupon<R: Rng + ?Sized>(fish: &Fish, now: DateTime<Utc>, rng: &mut R) -> Coupon {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    Coupon {
        id: format!("coupon_{}_{}", to_base36(millis), random_base36(rng, 6)),
        fish_id: fish.id.clone(),
        fish_name: fish.name.clone(),
        fish_weight: fish.weight,
        kind: CouponKind::GrilledFish,
        value: fish.species.species().value(),
        code: coupon_code(now, rng),
        created_at: now,
        expires_at: now + Duration::days(COUPON_VALIDITY_DAYS),
        used: false,
        used_at: None,
    }
}

/// Marks a coupon used. Used or expired coupons are rejected untouched.
pub fn redeem_coupon(coupon: &mut Coupon, now: DateTime<Utc>) -> Result<(), EconError> {
    if coupon.used {
        return Err(EconError::CouponUsed(coupon.code.clone()));
    }
    if coupon.is_expired(now) {
        return Err(EconError::CouponExpired(coupon.code.clone()));
    }
    coupon.used = true;
    coupon.used_at = Some(now);
    Ok(())
}

/// Sum of the coupon values of every adult fish.
pub fn adult_value(fishes: &[Fish]) -> Decimal {
    fishes
        .iter()
        .filter(|f| f.status == FishStatus::Adult)
        .map(|f| f.species.species().value())
        .sum()
}
