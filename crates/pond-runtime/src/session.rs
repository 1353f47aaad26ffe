use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use persistence::{load_snapshot, save_snapshot, KvStore, PersistError, Snapshot};
use pond_core::{
    validate_background, validate_config, Coupon, Fish, FishId, FishStatus, LifecyclePolicy,
    PelletId, PondConfig, PondError, SpeciesId, ValidationError,
};
use pond_econ::{adult_value, available_feed, charge_feed, ensure_feed, mint_coupon, FeedLedger};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capture::{self, NetState, NET_RESOLVE_MS};
use crate::growth;
use crate::movement;
use crate::pellets::{self, FoodPellet, EATEN_LINGER_MS, LANDED_LINGER_MS};
use crate::scheduler::{Deferred, Scheduler};

/// Result of feeding a single fish.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedReceipt {
    pub fish: FishId,
    pub name: String,
    /// Grams gained from this feeding.
    pub gain: f64,
    pub weight: f64,
    pub status: FishStatus,
}

impl FeedReceipt {
    pub fn message(&self) -> String {
        format!(
            "{} gained {:.0}g and now weighs {:.0}g",
            self.name, self.gain, self.weight
        )
    }
}

/// Result of feeding the whole pond.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum FeedAll {
    /// Neglect policy: this many fish were fed directly.
    Fed { count: usize },
    /// Pellet-chase policy: a pellet was dropped for the fish to race to.
    PelletDropped { pellet: PelletId },
}

/// A player's pond: fish, feed, coupons and the clock that drives them.
///
/// Every action runs to completion before the next one is accepted; deferred
/// effects (net resolution, pellet cleanup) fire from [`PondSession::advance`].
pub struct PondSession {
    config: PondConfig,
    store: Box<dyn KvStore>,
    rng: ChaCha8Rng,
    clock: DateTime<Utc>,
    user_id: Option<String>,
    username: String,
    fishes: Vec<Fish>,
    coupons: Vec<Coupon>,
    ledger: FeedLedger,
    background: u8,
    pellets: Vec<FoodPellet>,
    next_pellet: PelletId,
    net: NetState,
    caught: Option<FishId>,
    scheduler: Scheduler,
    dirty: bool,
}

impl PondSession {
    /// Loads the stored session (or a fresh one), applies the daily feed
    /// reset, gifts a starter fish to an empty pond, and saves.
    pub fn start(
        config: PondConfig,
        store: Box<dyn KvStore>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        let snap = load_snapshot(store.as_ref()).unwrap_or_default();
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);

        let mut fishes = snap.fishes;
        let mut caught = None;
        // The capture slot is not persisted; a caught fish reclaims it.
        for fish in fishes.iter_mut().filter(|f| f.status == FishStatus::Caught) {
            if caught.is_none() {
                caught = Some(fish.id.clone());
            } else {
                fish.status = capture::release_status(fish);
            }
        }

        let mut session = Self {
            ledger: FeedLedger {
                feed_count: snap.feed_count,
                share_bonus: snap.share_bonus,
                last_reset: snap.last_feed_date,
            },
            config,
            store,
            rng,
            clock: now,
            user_id: snap.user_id,
            username: snap.username,
            fishes,
            coupons: snap.coupons,
            background: snap.current_background,
            pellets: Vec::new(),
            next_pellet: 1,
            net: NetState::default(),
            caught,
            scheduler: Scheduler::new(),
            dirty: false,
        };
        session.roll_over_feed();
        session.update_growth();
        if session.fishes.is_empty() {
            let species = session.config.starter_species;
            let fish = Fish::spawn(species, now, &mut session.rng, false);
            info!(fish = %fish.id, %species, "gifted starter fish");
            session.fishes.push(fish);
        }
        info!(
            fishes = session.fishes.len(),
            coupons = session.coupons.len(),
            feed = session.total_feed_available(),
            "pond session started"
        );
        session.persist();
        Ok(session)
    }

    /// Adds a baby fish of `species`, e.g. after scanning an in-store code.
    pub fn add_fish(&mut self, species: SpeciesId, from_qr_code: bool) -> FishId {
        let fish = Fish::spawn(species, self.clock, &mut self.rng, from_qr_code);
        let id = fish.id.clone();
        info!(fish = %id, %species, from_qr_code, "fish added");
        self.fishes.push(fish);
        self.persist();
        id
    }

    /// Feeds one fish, paying from the feed ledger.
    pub fn feed_fish(&mut self, id: &FishId) -> Result<FeedReceipt, PondError> {
        let idx = self.index_of(id)?;
        ensure_feedable(&self.fishes[idx])?;
        ensure_feed(&self.ledger, self.config.feed_mode)?;
        charge_feed(&mut self.ledger, self.config.feed_mode)?;

        let fish = &mut self.fishes[idx];
        let gain = growth::apply_feeding(fish, self.clock, &mut self.rng);
        debug!(fish = %fish.id, gain, weight = fish.weight, "fed");
        let receipt = FeedReceipt {
            fish: fish.id.clone(),
            name: fish.name.clone(),
            gain,
            weight: fish.weight,
            status: fish.status,
        };
        self.persist();
        Ok(receipt)
    }

    /// Feeds the whole pond according to the lifecycle policy.
    pub fn feed_all(&mut self) -> Result<FeedAll, PondError> {
        if !self.fishes.iter().any(Fish::is_active) {
            return Err(PondError::invalid("there are no fish to feed"));
        }
        ensure_feed(&self.ledger, self.config.feed_mode)?;

        let outcome = match self.config.lifecycle {
            LifecyclePolicy::Neglect => {
                let mut count = 0;
                for fish in self.fishes.iter_mut().filter(|f| f.is_active()) {
                    if charge_feed(&mut self.ledger, self.config.feed_mode).is_err() {
                        break;
                    }
                    growth::apply_feeding(fish, self.clock, &mut self.rng);
                    count += 1;
                }
                info!(count, "fed every fish");
                FeedAll::Fed { count }
            }
            LifecyclePolicy::PelletChase => {
                charge_feed(&mut self.ledger, self.config.feed_mode)?;
                let id = self.next_pellet;
                self.next_pellet += 1;
                let pellet = FoodPellet::spawn(id, &mut self.rng);
                for fish in self
                    .fishes
                    .iter_mut()
                    .filter(|f| f.is_active() && f.chasing.is_none())
                {
                    fish.chasing = Some(id);
                }
                debug!(pellet = id, x = pellet.x, "pellet dropped");
                self.pellets.push(pellet);
                FeedAll::PelletDropped { pellet: id }
            }
        };
        self.persist();
        Ok(outcome)
    }

    /// Casts the net at `(x, y)` and returns how many fish it may hold.
    ///
    /// The net comes up [`NET_RESOLVE_MS`] later; if any candidate is still
    /// in the pond then, the first one lands in the capture slot.
    pub fn cast_net(&mut self, x: f64, y: f64) -> Result<usize, PondError> {
        if self.caught.is_some() {
            return Err(PondError::invalid(
                "a fish is already in the net; release it or send it to the restaurant",
            ));
        }
        if self.net.active {
            return Err(PondError::invalid("the net is still in the water"));
        }
        if !(x.is_finite() && y.is_finite()) {
            return Err(PondError::invalid("net position must be finite"));
        }
        let candidates = capture::net_candidates(&self.fishes, x, y, &mut self.rng);
        self.net = NetState { active: true, x, y };
        self.scheduler.schedule(
            self.clock + Duration::milliseconds(NET_RESOLVE_MS),
            Deferred::ResolveNet {
                candidate: candidates.first().cloned(),
            },
        );
        debug!(x, y, candidates = candidates.len(), "net cast");
        Ok(candidates.len())
    }

    /// Returns the caught fish to the pond and reports its new status.
    pub fn release_fish(&mut self) -> Result<FishStatus, PondError> {
        let id = self
            .caught
            .clone()
            .ok_or_else(|| PondError::invalid("there is no fish in the net"))?;
        let idx = self.index_of(&id)?;
        let fish = &mut self.fishes[idx];
        fish.status = capture::release_status(fish);
        let status = fish.status;
        info!(fish = %id, ?status, "fish released");
        self.caught = None;
        self.persist();
        Ok(status)
    }

    /// Trades the caught fish for a grilled-fish coupon.
    pub fn send_to_restaurant(&mut self) -> Result<Coupon, PondError> {
        let id = self
            .caught
            .clone()
            .ok_or_else(|| PondError::invalid("there is no fish in the net"))?;
        let idx = self.index_of(&id)?;
        let coupon = self.exchange_for_coupon(idx);
        self.caught = None;
        self.persist();
        Ok(coupon)
    }

    /// Trades an adult fish straight from the pond for a coupon.
    pub fn harvest_fish(&mut self, id: &FishId) -> Result<Coupon, PondError> {
        let idx = self.index_of(id)?;
        let fish = &self.fishes[idx];
        if fish.status != FishStatus::Adult {
            return Err(PondError::invalid(format!(
                "{} is not fully grown yet ({:.0}%)",
                fish.name, fish.growth
            )));
        }
        let coupon = self.exchange_for_coupon(idx);
        self.persist();
        Ok(coupon)
    }

    /// Credits the share bonus and returns the amount granted.
    pub fn share_to_friend(&mut self) -> u32 {
        let bonus = self.config.share_bonus;
        self.ledger.grant_share_bonus(bonus);
        info!(bonus, available = self.total_feed_available(), "shared with a friend");
        self.persist();
        bonus
    }

    pub fn set_background(&mut self, id: u8) -> Result<(), PondError> {
        validate_background(id).map_err(|e| PondError::invalid(e.to_string()))?;
        self.background = id;
        self.persist();
        Ok(())
    }

    /// Marks the coupon with `code` as used.
    pub fn redeem_coupon(&mut self, code: &str) -> Result<Coupon, PondError> {
        let now = self.clock;
        let coupon = self
            .coupons
            .iter_mut()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| PondError::NotFound(format!("coupon {code}")))?;
        pond_econ::redeem_coupon(coupon, now)?;
        info!(code = %coupon.code, "coupon redeemed");
        let redeemed = coupon.clone();
        self.persist();
        Ok(redeemed)
    }

    /// Moves the clock forward by `dt`.
    ///
    /// The first `max_substeps` ticks are simulated in full: deferred effects,
    /// movement, pellets and growth. Anything longer is fast-forwarded, firing
    /// deferred effects in order and recomputing growth once at the end.
    pub fn advance(&mut self, dt: Duration) {
        if dt <= Duration::zero() {
            return;
        }
        let tick = Duration::milliseconds(i64::from(self.config.tick_ms));
        let mut remaining = dt;
        let mut substeps = 0;
        while remaining > Duration::zero() && substeps < self.config.max_substeps {
            let step = remaining.min(tick);
            remaining = remaining - step;
            self.clock = self.clock + step;
            substeps += 1;
            let factor = step.num_milliseconds() as f64 / tick.num_milliseconds() as f64;
            self.step(factor);
        }
        if remaining > Duration::zero() {
            let target = self.clock + remaining;
            while let Some(due) = self.scheduler.next_due() {
                if due > target {
                    break;
                }
                self.clock = self.clock.max(due);
                self.fire_due();
            }
            self.clock = target;
            self.update_growth();
            debug!(skipped_ms = remaining.num_milliseconds(), "fast-forwarded");
        }
        self.roll_over_feed();
        if self.dirty {
            self.persist();
        }
    }

    /// Recomputes weight and status of every fish at the current time.
    pub fn recompute_growth(&mut self) {
        self.update_growth();
        if self.dirty {
            self.persist();
        }
    }

    /// Coupon value of all adult fish.
    pub fn total_fish_value(&self) -> Decimal {
        adult_value(&self.fishes)
    }

    pub fn adult_fish_count(&self) -> usize {
        self.fishes
            .iter()
            .filter(|f| f.status == FishStatus::Adult)
            .count()
    }

    pub fn total_feed_available(&self) -> u32 {
        available_feed(&self.ledger, self.config.feed_mode)
    }

    /// Night runs from 19:00 to 06:00 on the player's wall clock.
    pub fn is_night(&self) -> bool {
        !(6..19).contains(&self.local_clock().hour())
    }

    pub fn config(&self) -> &PondConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn fishes(&self) -> &[Fish] {
        &self.fishes
    }

    pub fn fish(&self, id: &FishId) -> Option<&Fish> {
        self.fishes.iter().find(|f| &f.id == id)
    }

    pub fn coupons(&self) -> &[Coupon] {
        &self.coupons
    }

    pub fn ledger(&self) -> &FeedLedger {
        &self.ledger
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    pub fn pellets(&self) -> &[FoodPellet] {
        &self.pellets
    }

    pub fn net(&self) -> &NetState {
        &self.net
    }

    pub fn caught_fish(&self) -> Option<&Fish> {
        self.caught.as_ref().and_then(|id| self.fish(id))
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    /// Persistable view of the session. Pellets and the net are transient.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            feed_count: self.ledger.feed_count,
            share_bonus: self.ledger.share_bonus,
            last_feed_date: self.ledger.last_reset,
            fishes: self.fishes.clone(),
            coupons: self.coupons.clone(),
            current_background: self.background,
        }
    }

    /// Writes the snapshot to the store.
    pub fn save(&mut self) -> Result<(), PersistError> {
        let snap = self.snapshot();
        save_snapshot(self.store.as_mut(), &snap)?;
        self.dirty = false;
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to save pond session");
        }
    }

    fn index_of(&self, id: &FishId) -> Result<usize, PondError> {
        self.fishes
            .iter()
            .position(|f| &f.id == id)
            .ok_or_else(|| PondError::NotFound(format!("fish {id}")))
    }

    fn exchange_for_coupon(&mut self, idx: usize) -> Coupon {
        let fish = self.fishes.remove(idx);
        let coupon = mint_coupon(&fish, self.clock, &mut self.rng);
        info!(fish = %fish.id, code = %coupon.code, value = %coupon.value, "coupon issued");
        self.coupons.push(coupon.clone());
        coupon
    }

    fn local_clock(&self) -> DateTime<FixedOffset> {
        self.clock.with_timezone(&self.config.local_offset())
    }

    fn roll_over_feed(&mut self) {
        let today = self.local_clock().date_naive();
        if self
            .ledger
            .roll_over(today, self.config.daily_feed_allowance)
        {
            self.dirty = true;
        }
    }

    fn step(&mut self, factor: f64) {
        self.fire_due();
        self.move_fish(factor);
        self.advance_pellets(factor);
        self.update_growth();
    }

    fn fire_due(&mut self) {
        while let Some(event) = self.scheduler.pop_due(self.clock) {
            match event {
                Deferred::ResolveNet { candidate } => self.resolve_net(candidate),
                Deferred::RemovePellet(id) => {
                    self.pellets.retain(|p| p.id != id);
                    self.retarget_chasers(id);
                }
            }
        }
    }

    fn resolve_net(&mut self, candidate: Option<FishId>) {
        self.net.active = false;
        let Some(id) = candidate else {
            debug!("net came up empty");
            return;
        };
        if self.caught.is_some() {
            return;
        }
        match self.fishes.iter_mut().find(|f| f.id == id && f.is_active()) {
            Some(fish) => {
                fish.status = FishStatus::Caught;
                fish.chasing = None;
                info!(fish = %fish.id, name = %fish.name, "fish caught");
                self.caught = Some(id);
                self.dirty = true;
            }
            None => debug!(fish = %id, "candidate slipped away before the net came up"),
        }
    }

    fn move_fish(&mut self, factor: f64) {
        let live = &self.pellets;
        for fish in self.fishes.iter_mut().filter(|f| f.is_active()) {
            let chase = fish
                .chasing
                .and_then(|id| live.iter().find(|p| p.id == id && !p.eaten))
                .map(FoodPellet::position);
            if chase.is_none() {
                fish.chasing = None;
            }
            movement::steer(fish, chase, factor, &mut self.rng);
        }
    }

    fn advance_pellets(&mut self, factor: f64) {
        let now = self.clock;
        for i in 0..self.pellets.len() {
            if self.pellets[i].eaten {
                continue;
            }
            let pellet_id = self.pellets[i].id;
            if self.pellets[i].fall(factor) {
                self.scheduler.schedule(
                    now + Duration::milliseconds(LANDED_LINGER_MS),
                    Deferred::RemovePellet(pellet_id),
                );
            }
            let Some(idx) = pellets::first_eater(&self.fishes, &self.pellets[i]) else {
                continue;
            };
            let fish = &mut self.fishes[idx];
            let gain = growth::apply_feeding(fish, now, &mut self.rng);
            fish.chasing = None;
            debug!(fish = %fish.id, pellet = pellet_id, gain, "pellet eaten");
            self.pellets[i].eaten = true;
            self.pellets[i].eaten_by = Some(fish.id.clone());
            self.scheduler.schedule(
                now + Duration::milliseconds(EATEN_LINGER_MS),
                Deferred::RemovePellet(pellet_id),
            );
            self.retarget_chasers(pellet_id);
            self.dirty = true;
        }
    }

    /// Points fish that were chasing `gone` at the nearest remaining pellet.
    fn retarget_chasers(&mut self, gone: PelletId) {
        let live = &self.pellets;
        for fish in self
            .fishes
            .iter_mut()
            .filter(|f| f.chasing == Some(gone))
        {
            fish.chasing = pellets::nearest_uneaten(live, fish.x, fish.y);
        }
    }

    fn update_growth(&mut self) {
        let before = self.fishes.len();
        self.fishes.retain(|f| f.status != FishStatus::Dead);
        if self.fishes.len() != before {
            info!(purged = before - self.fishes.len(), "removed dead fish");
            self.dirty = true;
        }
        let (now, policy) = (self.clock, self.config.lifecycle);
        for fish in &mut self.fishes {
            if let Some((from, to)) = growth::recompute(fish, now, policy) {
                match to {
                    FishStatus::Dead => {
                        fish.chasing = None;
                        warn!(fish = %fish.id, name = %fish.name, "fish starved");
                    }
                    _ => info!(fish = %fish.id, ?from, ?to, "status changed"),
                }
                self.dirty = true;
            }
        }
    }
}

fn ensure_feedable(fish: &Fish) -> Result<(), PondError> {
    match fish.status {
        FishStatus::Dead => Err(PondError::invalid(format!("{} has died", fish.name))),
        FishStatus::Caught => Err(PondError::invalid(format!(
            "{} is in the net and cannot be fed",
            fish.name
        ))),
        _ => Ok(()),
    }
}
