#![deny(warnings)]

//! Session runtime for Forux Idle: the economy ledger, the passive accrual
//! clock, the meteor event scheduler, and the session aggregate that
//! serializes every mutation onto one logical thread.
//!
//! Time is supplied by the host as a [`Duration`] since session start; the
//! runtime owns no real timers. The presentation layer drives
//! [`GameSession::advance`] from its own clock, reads state through
//! [`GameSession::snapshot`], and drains fire-and-forget [`GameSignal`]s to
//! dispatch to its audio/animation subsystems.

use idle_core::{
    validate_catalog, validate_config, Catalog, EffectKind, GameConfig, UpgradeId, ValidationError,
    Viewport, Wallet,
};
use idle_econ::{meteor_reward, trade_payout, upgrade_cost, EconError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info};

/// Fire-and-forget side-effect signals for the presentation layer. The core
/// never waits on their completion nor depends on their success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameSignal {
    /// A tap landed.
    PlayClickSound,
    /// An upgrade purchase or trade went through.
    PlayUpgradeSound,
    /// A meteor was caught.
    PlayRewardSound,
    /// Show the transient "+amount" reward text.
    ShowRewardNotice {
        /// Dilithium credited by the reward.
        amount: u64,
    },
    /// Present the one-time first-contact dialog.
    ShowFirstContactDialog,
}

/// Result of a successful upgrade purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Level after the purchase.
    pub new_level: u32,
    /// Dilithium debited.
    pub cost_paid: u64,
    /// Cost of the following level.
    pub next_cost: u64,
}

/// Result of a successful trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    /// Dilithium debited.
    pub dilithium_spent: u64,
    /// Coins credited (floored at the exchange rate).
    pub coins_received: u64,
}

/// Single source of truth for balances, upgrade levels, and the derived
/// aggregates. Costs are always recomputed from the level, never stored, so
/// they cannot drift.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    catalog: Catalog,
    wallet: Wallet,
    levels: BTreeMap<UpgradeId, u32>,
    total_click_power: u64,
    total_passive_income: u64,
}

impl Ledger {
    /// Build a ledger with every catalog upgrade at level 0.
    pub fn new(catalog: Catalog) -> Result<Self, ValidationError> {
        validate_catalog(&catalog)?;
        let levels = catalog.upgrades.iter().map(|d| (d.id.clone(), 0)).collect();
        let mut ledger = Ledger {
            catalog,
            wallet: Wallet::default(),
            levels,
            total_click_power: 0,
            total_passive_income: 0,
        };
        ledger.recompute_totals();
        Ok(ledger)
    }

    fn recompute_totals(&mut self) {
        // Base tap yield is 1; passive income starts at 0.
        let mut click: u64 = 1;
        let mut income: u64 = 0;
        for def in &self.catalog.upgrades {
            let level = u64::from(self.levels.get(&def.id).copied().unwrap_or(0));
            let bonus = level.saturating_mul(def.magnitude);
            match def.effect {
                EffectKind::ClickPower => click = click.saturating_add(bonus),
                EffectKind::PassiveIncome => income = income.saturating_add(bonus),
            }
        }
        self.total_click_power = click;
        self.total_passive_income = income;
    }

    /// Current balances.
    pub fn wallet(&self) -> Wallet {
        self.wallet
    }

    /// Dilithium gained per tap.
    pub fn total_click_power(&self) -> u64 {
        self.total_click_power
    }

    /// Dilithium gained per accrual second.
    pub fn total_passive_income(&self) -> u64 {
        self.total_passive_income
    }

    /// Purchased level of an upgrade, if it exists.
    pub fn level(&self, id: &UpgradeId) -> Option<u32> {
        self.levels.get(id).copied()
    }

    /// Cost of the next level, derived from the current level.
    pub fn current_cost(&self, id: &UpgradeId) -> Option<u64> {
        let def = self.catalog.get(id)?;
        let level = self.levels.get(id).copied().unwrap_or(0);
        Some(upgrade_cost(def.base_cost, def.cost_growth, level))
    }

    /// Credit one tap's worth of dilithium. Always succeeds.
    pub fn apply_tap(&mut self) -> u64 {
        let gain = self.total_click_power;
        self.wallet.dilithium = self.wallet.dilithium.saturating_add(gain);
        gain
    }

    /// Credit one second of passive income. No-op while income is zero.
    pub fn apply_passive_tick(&mut self) -> u64 {
        let gain = self.total_passive_income;
        if gain > 0 {
            self.wallet.dilithium = self.wallet.dilithium.saturating_add(gain);
        }
        gain
    }

    /// Unconditionally credit a bonus reward. The meteor scheduler's phase
    /// transition guarantees at most one call per event.
    pub fn apply_reward(&mut self, amount: u64) {
        self.wallet.dilithium = self.wallet.dilithium.saturating_add(amount);
    }

    /// Buy one level of an upgrade. On failure nothing is mutated; the error
    /// is a guarded no-op for the UI, not a fault.
    pub fn try_purchase(&mut self, id: &UpgradeId) -> Result<PurchaseReceipt, EconError> {
        let cost = self
            .current_cost(id)
            .ok_or_else(|| EconError::UnknownUpgrade(id.0.clone()))?;
        if self.wallet.dilithium < cost {
            return Err(EconError::InsufficientFunds {
                required: cost,
                available: self.wallet.dilithium,
            });
        }
        self.wallet.dilithium -= cost;
        let level = self.levels.entry(id.clone()).or_insert(0);
        *level += 1;
        let new_level = *level;
        self.recompute_totals();
        let next_cost = self.current_cost(id).unwrap_or(u64::MAX);
        debug!(upgrade = %id.0, new_level, cost, "upgrade purchased");
        Ok(PurchaseReceipt {
            new_level,
            cost_paid: cost,
            next_cost,
        })
    }

    /// Exchange dilithium for coins at `rate` dilithium per coin. On failure
    /// both balances are untouched.
    pub fn try_trade(&mut self, amount: u64, rate: u64) -> Result<TradeReceipt, EconError> {
        let coins = trade_payout(amount, rate)?;
        if self.wallet.dilithium < amount {
            return Err(EconError::InsufficientFunds {
                required: amount,
                available: self.wallet.dilithium,
            });
        }
        self.wallet.dilithium -= amount;
        self.wallet.coins = self.wallet.coins.saturating_add(coins);
        Ok(TradeReceipt {
            dilithium_spent: amount,
            coins_received: coins,
        })
    }
}

/// Fixed-period accumulator driving a periodic process from host-supplied
/// time. Started on session mount and stopped exactly once on disposal;
/// advancing a stopped clock yields no ticks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccrualClock {
    period: Duration,
    consumed: Duration,
    running: bool,
}

impl AccrualClock {
    /// Start a clock with the given period.
    pub fn start(period: Duration) -> Self {
        AccrualClock {
            period,
            consumed: Duration::ZERO,
            running: true,
        }
    }

    /// Whole periods completed up to `now` and not yet reported.
    pub fn advance(&mut self, now: Duration) -> u32 {
        if !self.running || self.period.is_zero() {
            return 0;
        }
        let pending = now.saturating_sub(self.consumed);
        let ticks = (pending.as_nanos() / self.period.as_nanos()).min(u128::from(u32::MAX)) as u32;
        self.consumed += self.period * ticks;
        ticks
    }

    /// Release the clock. Further `advance` calls are no-ops.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the clock still ticks.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Which way a meteor crosses the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Enters off the left edge, exits right.
    LeftToRight,
    /// Enters off the right edge, exits left.
    RightToLeft,
}

/// Lifecycle of the bonus meteor event. At most one meteor travels at a time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MeteorPhase {
    /// No meteor on screen; the eligibility check runs on its cadence.
    Idle,
    /// A meteor is crossing the screen and can be caught.
    Traveling {
        /// Current horizontal position.
        x: f32,
        /// Spawn-rolled vertical position inside the safe band.
        y: f32,
        /// Travel direction.
        direction: Direction,
    },
}

/// Spawn descriptor handed to the host when a meteor appears.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeteorSpawn {
    /// Starting horizontal position, fully off the entry edge.
    pub x: f32,
    /// Vertical position inside the safe band.
    pub y: f32,
    /// Travel direction.
    pub direction: Direction,
}

/// Outcome of advancing a traveling meteor by one animation frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlightStatus {
    /// No meteor in flight.
    Idle,
    /// Still crossing; current position.
    Traveling {
        /// Current horizontal position.
        x: f32,
        /// Vertical position.
        y: f32,
    },
    /// Crossed past the exit edge uncaught; no reward.
    Missed,
}

/// Periodic bonus-event scheduler: `Idle` → `Traveling` → `Idle`. Spawns are
/// gated on positive passive income and a minimum dwell between events; the
/// direction and vertical position come from a seeded RNG so sessions are
/// reproducible.
#[derive(Clone, Debug)]
pub struct MeteorScheduler {
    viewport: Viewport,
    spawn_interval: Duration,
    reward_multiplier: u64,
    min_reward: u64,
    step: f32,
    margin: f32,
    rng: ChaCha8Rng,
    phase: MeteorPhase,
    next_spawn_at: Duration,
    caught: u32,
    missed: u32,
}

impl MeteorScheduler {
    /// Create an idle scheduler; the first spawn becomes eligible after the
    /// configured grace delay rather than immediately.
    pub fn new(config: &GameConfig, now: Duration) -> Self {
        MeteorScheduler {
            viewport: config.viewport,
            spawn_interval: config.meteor_spawn_interval,
            reward_multiplier: config.meteor_reward_multiplier,
            min_reward: config.meteor_min_reward,
            step: config.meteor_step,
            margin: config.spawn_margin,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            phase: MeteorPhase::Idle,
            next_spawn_at: now + config.meteor_grace_delay,
            caught: 0,
            missed: 0,
        }
    }

    /// Idle-state eligibility check, run on the coarse check cadence. Never
    /// spawns while a meteor is already traveling or passive income is zero.
    pub fn poll(&mut self, now: Duration, passive_income: u64) -> Option<MeteorSpawn> {
        if !matches!(self.phase, MeteorPhase::Idle) {
            return None;
        }
        if passive_income == 0 || now < self.next_spawn_at {
            return None;
        }
        let direction = if self.rng.gen_bool(0.5) {
            Direction::LeftToRight
        } else {
            Direction::RightToLeft
        };
        let (top, bottom) = self.viewport.safe_band();
        let y = self.rng.gen_range(top..bottom);
        let x = match direction {
            Direction::LeftToRight => -self.margin,
            Direction::RightToLeft => self.viewport.width + self.margin,
        };
        self.phase = MeteorPhase::Traveling { x, y, direction };
        self.next_spawn_at = now + self.spawn_interval;
        info!(?direction, y, "meteor spawned");
        Some(MeteorSpawn { x, y, direction })
    }

    /// Move a traveling meteor one frame; crossing past the exit edge is a
    /// miss and the cycle returns to idle with no reward.
    pub fn advance_frame(&mut self) -> FlightStatus {
        let MeteorPhase::Traveling { x, y, direction } = self.phase else {
            return FlightStatus::Idle;
        };
        let (x, out) = match direction {
            Direction::LeftToRight => {
                let x = x + self.step;
                (x, x > self.viewport.width + self.margin)
            }
            Direction::RightToLeft => {
                let x = x - self.step;
                (x, x < -self.margin)
            }
        };
        if out {
            self.phase = MeteorPhase::Idle;
            self.missed += 1;
            debug!("meteor left the screen uncaught");
            FlightStatus::Missed
        } else {
            self.phase = MeteorPhase::Traveling { x, y, direction };
            FlightStatus::Traveling { x, y }
        }
    }

    /// Resolve a click on the traveling meteor. The phase transition back to
    /// idle makes the reward payable exactly once per event.
    pub fn collect(&mut self, passive_income: u64) -> Option<u64> {
        if !matches!(self.phase, MeteorPhase::Traveling { .. }) {
            return None;
        }
        self.phase = MeteorPhase::Idle;
        self.caught += 1;
        let reward = meteor_reward(passive_income, self.reward_multiplier, self.min_reward);
        info!(reward, "meteor caught");
        Some(reward)
    }

    /// Abort an in-flight meteor, e.g. when the owning screen is torn down.
    pub fn cancel(&mut self) {
        self.phase = MeteorPhase::Idle;
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> MeteorPhase {
        self.phase
    }

    /// Meteors caught this session.
    pub fn caught(&self) -> u32 {
        self.caught
    }

    /// Meteors that crossed uncaught.
    pub fn missed(&self) -> u32 {
        self.missed
    }
}

/// One-shot gate for the first-contact dialog: arms when passive income
/// first becomes positive, fires once after a short delay, never resets
/// within a session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FirstContactGate {
    delay: Duration,
    due_at: Option<Duration>,
    shown: bool,
}

impl FirstContactGate {
    /// Unarmed gate.
    pub fn new(delay: Duration) -> Self {
        FirstContactGate {
            delay,
            due_at: None,
            shown: false,
        }
    }

    /// Arm the gate the first time passive income turns positive.
    pub fn note_income(&mut self, passive_income: u64, now: Duration) {
        if !self.shown && self.due_at.is_none() && passive_income > 0 {
            self.due_at = Some(now + self.delay);
        }
    }

    /// True at most once, after the arming delay has elapsed.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.due_at {
            Some(due) if !self.shown && now >= due => {
                self.shown = true;
                true
            }
            _ => false,
        }
    }

    /// Whether the dialog has been presented this session.
    pub fn shown(&self) -> bool {
        self.shown
    }
}

/// Transient "+amount" text shown after catching a meteor; cleared by the
/// session once the display duration has passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardNotice {
    /// Dilithium credited by the reward.
    pub amount: u64,
    /// Session time at which the notice self-clears.
    pub expires_at: Duration,
}

/// Per-upgrade line of a [`SessionSnapshot`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeSnapshot {
    /// Upgrade identifier.
    pub id: UpgradeId,
    /// Localization key for the display name.
    pub name_key: String,
    /// Purchased level.
    pub level: u32,
    /// Cost of the next level.
    pub current_cost: u64,
}

/// Read model for the presentation layer and the CLI summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session time of the last `advance`.
    pub elapsed: Duration,
    /// Primary balance.
    pub dilithium: u64,
    /// Secondary balance.
    pub coins: u64,
    /// Dilithium per tap.
    pub total_click_power: u64,
    /// Dilithium per accrual second.
    pub total_passive_income: u64,
    /// One line per catalog upgrade.
    pub upgrades: Vec<UpgradeSnapshot>,
    /// Meteor lifecycle phase.
    pub meteor: MeteorPhase,
    /// Taps landed this session.
    pub taps: u64,
    /// Meteors caught.
    pub meteors_caught: u32,
    /// Meteors that crossed uncaught.
    pub meteors_missed: u32,
    /// Whether the first-contact dialog has fired.
    pub first_contact_shown: bool,
}

/// The session aggregate. Owns every piece of mutable game state and
/// serializes all mutation (user input and both periodic processes) onto the
/// caller's single logical thread, so no locking is needed.
#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    ledger: Ledger,
    accrual: AccrualClock,
    checker: AccrualClock,
    meteor: MeteorScheduler,
    first_contact: FirstContactGate,
    notice: Option<RewardNotice>,
    signals: VecDeque<GameSignal>,
    now: Duration,
    taps: u64,
    disposed: bool,
}

impl GameSession {
    /// Validate the static data and mount a fresh session at time zero with
    /// both periodic processes running.
    pub fn new(catalog: Catalog, config: GameConfig) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        let ledger = Ledger::new(catalog)?;
        let meteor = MeteorScheduler::new(&config, Duration::ZERO);
        let accrual = AccrualClock::start(config.accrual_period);
        let checker = AccrualClock::start(config.meteor_check_interval);
        let first_contact = FirstContactGate::new(config.first_contact_delay);
        Ok(GameSession {
            config,
            ledger,
            accrual,
            checker,
            meteor,
            first_contact,
            notice: None,
            signals: VecDeque::new(),
            now: Duration::ZERO,
            taps: 0,
            disposed: false,
        })
    }

    /// Tap the planet.
    pub fn tap(&mut self) -> u64 {
        let gain = self.ledger.apply_tap();
        self.taps += 1;
        self.signals.push_back(GameSignal::PlayClickSound);
        gain
    }

    /// Buy one level of an upgrade; emits the upgrade sound on success.
    pub fn purchase(&mut self, id: &UpgradeId) -> Result<PurchaseReceipt, EconError> {
        let receipt = self.ledger.try_purchase(id)?;
        self.signals.push_back(GameSignal::PlayUpgradeSound);
        self.first_contact
            .note_income(self.ledger.total_passive_income(), self.now);
        Ok(receipt)
    }

    /// Exchange dilithium for coins at the configured rate.
    pub fn trade(&mut self, amount: u64) -> Result<TradeReceipt, EconError> {
        let receipt = self.ledger.try_trade(amount, self.config.trade_rate)?;
        self.signals.push_back(GameSignal::PlayUpgradeSound);
        info!(amount, coins = receipt.coins_received, "trade completed");
        Ok(receipt)
    }

    /// Drive both periodic processes up to `now` (time since session start).
    /// Time never runs backwards; a stale `now` is clamped to the latest seen.
    pub fn advance(&mut self, now: Duration) {
        if self.disposed {
            return;
        }
        self.now = self.now.max(now);
        for _ in 0..self.accrual.advance(self.now) {
            self.ledger.apply_passive_tick();
        }
        for _ in 0..self.checker.advance(self.now) {
            // The spawn is observable through the meteor phase; no signal.
            self.meteor.poll(self.now, self.ledger.total_passive_income());
        }
        if self.first_contact.poll(self.now) {
            self.signals.push_back(GameSignal::ShowFirstContactDialog);
        }
        if let Some(notice) = self.notice {
            if self.now >= notice.expires_at {
                self.notice = None;
            }
        }
    }

    /// Advance a traveling meteor one animation frame. The flight loop stops
    /// on its own once the meteor leaves the screen or the session is
    /// disposed.
    pub fn frame(&mut self) -> FlightStatus {
        if self.disposed {
            return FlightStatus::Idle;
        }
        self.meteor.advance_frame()
    }

    /// Resolve a click on the traveling meteor: credits the reward exactly
    /// once and raises the reward sound and notice signals.
    pub fn collect_meteor(&mut self) -> Option<u64> {
        if self.disposed {
            return None;
        }
        let reward = self
            .meteor
            .collect(self.ledger.total_passive_income())?;
        self.ledger.apply_reward(reward);
        self.signals.push_back(GameSignal::PlayRewardSound);
        self.signals
            .push_back(GameSignal::ShowRewardNotice { amount: reward });
        self.notice = Some(RewardNotice {
            amount: reward,
            expires_at: self.now + self.config.reward_notice_duration,
        });
        Some(reward)
    }

    /// Tear the session down: stops both clocks and cancels an in-flight
    /// meteor. Idempotent; everything periodic becomes a no-op afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.accrual.stop();
        self.checker.stop();
        self.meteor.cancel();
        self.disposed = true;
        debug!("session disposed; periodic processes stopped");
    }

    /// Pop every queued side-effect signal, in emission order.
    pub fn drain_signals(&mut self) -> Vec<GameSignal> {
        self.signals.drain(..).collect()
    }

    /// Read-only ledger access.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current meteor lifecycle phase.
    pub fn meteor_phase(&self) -> MeteorPhase {
        self.meteor.phase()
    }

    /// The reward notice currently on screen, if any.
    pub fn reward_notice(&self) -> Option<RewardNotice> {
        self.notice
    }

    /// Assemble the read model for rendering or reporting.
    pub fn snapshot(&self) -> SessionSnapshot {
        let upgrades = self
            .ledger
            .catalog
            .upgrades
            .iter()
            .map(|def| UpgradeSnapshot {
                id: def.id.clone(),
                name_key: def.name_key.clone(),
                level: self.ledger.level(&def.id).unwrap_or(0),
                current_cost: self.ledger.current_cost(&def.id).unwrap_or(u64::MAX),
            })
            .collect();
        let wallet = self.ledger.wallet();
        SessionSnapshot {
            elapsed: self.now,
            dilithium: wallet.dilithium,
            coins: wallet.coins,
            total_click_power: self.ledger.total_click_power(),
            total_passive_income: self.ledger.total_passive_income(),
            upgrades,
            meteor: self.meteor.phase(),
            taps: self.taps,
            meteors_caught: self.meteor.caught(),
            meteors_missed: self.meteor.missed(),
            first_contact_shown: self.first_contact.shown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(Catalog::standard(), GameConfig::default()).unwrap()
    }

    fn id(s: &str) -> UpgradeId {
        UpgradeId(s.to_string())
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn cold_start_scenario() {
        let mut s = session();
        assert_eq!(s.ledger().total_click_power(), 1);
        assert_eq!(s.ledger().total_passive_income(), 0);

        assert_eq!(s.tap(), 1);
        assert_eq!(s.ledger().wallet().dilithium, 1);

        // 1 < 50: the purchase is a guarded no-op.
        let err = s.purchase(&id("dilithium_extraction")).unwrap_err();
        assert_eq!(
            err,
            EconError::InsufficientFunds {
                required: 50,
                available: 1
            }
        );
        assert_eq!(s.ledger().wallet().dilithium, 1);
        assert_eq!(s.ledger().level(&id("dilithium_extraction")), Some(0));

        for _ in 0..49 {
            s.tap();
        }
        assert_eq!(s.ledger().wallet().dilithium, 50);
        let receipt = s.purchase(&id("dilithium_extraction")).unwrap();
        assert_eq!(receipt.new_level, 1);
        assert_eq!(receipt.cost_paid, 50);
        assert_eq!(receipt.next_cost, 57);
        assert_eq!(s.ledger().wallet().dilithium, 0);
        assert_eq!(s.ledger().total_click_power(), 2);
    }

    #[test]
    fn unknown_upgrade_rejected() {
        let mut s = session();
        assert_eq!(
            s.purchase(&id("warp_core")).unwrap_err(),
            EconError::UnknownUpgrade("warp_core".into())
        );
    }

    #[test]
    fn cost_curve_tracks_level() {
        let mut s = session();
        s.ledger.apply_reward(1_000_000);
        let target = id("dilithium_extraction");
        for n in 1..=10u32 {
            s.purchase(&target).unwrap();
            assert_eq!(s.ledger().level(&target), Some(n));
            assert_eq!(
                s.ledger().current_cost(&target).unwrap(),
                idle_econ::upgrade_cost(50, idle_core::standard_cost_growth(), n)
            );
        }
    }

    #[test]
    fn aggregates_follow_levels() {
        let mut s = session();
        s.ledger.apply_reward(10_000_000);
        s.purchase(&id("phase_resonator")).unwrap();
        s.purchase(&id("phase_resonator")).unwrap();
        s.purchase(&id("crystal_compressor")).unwrap();
        assert_eq!(s.ledger().total_click_power(), 1 + 2 * 5 + 100);
        s.purchase(&id("dilithium_conduit")).unwrap();
        s.purchase(&id("dilithium_cascade")).unwrap();
        assert_eq!(s.ledger().total_passive_income(), 6 + 200);
    }

    #[test]
    fn passive_tick_is_noop_at_zero_income() {
        let mut s = session();
        s.advance(secs(30));
        assert_eq!(s.ledger().wallet().dilithium, 0);
    }

    #[test]
    fn passive_accrual_credits_once_per_second() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        assert_eq!(s.ledger().wallet().dilithium, 0);
        s.advance(secs(10));
        assert_eq!(s.ledger().wallet().dilithium, 10);
        // Fractional remainder carries instead of rounding up.
        s.advance(secs(10) + Duration::from_millis(900));
        assert_eq!(s.ledger().wallet().dilithium, 10);
        s.advance(secs(11));
        assert_eq!(s.ledger().wallet().dilithium, 11);
    }

    #[test]
    fn meteor_never_spawns_without_income() {
        let mut s = session();
        s.advance(secs(3_600));
        assert_eq!(s.meteor_phase(), MeteorPhase::Idle);
    }

    #[test]
    fn meteor_spawns_after_grace_period() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(29));
        assert_eq!(s.meteor_phase(), MeteorPhase::Idle);
        s.advance(secs(35));
        let MeteorPhase::Traveling { x, y, direction } = s.meteor_phase() else {
            panic!("meteor should be traveling");
        };
        let viewport = GameConfig::default().viewport;
        let (top, bottom) = viewport.safe_band();
        assert!(y >= top && y < bottom);
        match direction {
            Direction::LeftToRight => assert!(x < 0.0),
            Direction::RightToLeft => assert!(x > viewport.width),
        }
    }

    #[test]
    fn only_one_meteor_at_a_time() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(35));
        assert!(matches!(s.meteor_phase(), MeteorPhase::Traveling { .. }));
        // Hours pass with the meteor still in flight: the checker must not
        // fire again.
        s.advance(secs(7_200));
        assert_eq!(s.snapshot().meteors_caught, 0);
        assert_eq!(s.snapshot().meteors_missed, 0);
        s.collect_meteor().unwrap();
        assert_eq!(s.snapshot().meteors_caught, 1);
    }

    #[test]
    fn spawn_dwell_is_measured_from_last_trigger() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(35));
        assert!(matches!(s.meteor_phase(), MeteorPhase::Traveling { .. }));
        s.collect_meteor().unwrap();
        // Triggered at 35 s; the next spawn is eligible at 215 s.
        s.advance(secs(214));
        assert_eq!(s.meteor_phase(), MeteorPhase::Idle);
        s.advance(secs(216));
        assert!(matches!(s.meteor_phase(), MeteorPhase::Traveling { .. }));
    }

    #[test]
    fn meteor_reward_pays_exactly_once() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(35));
        let before = s.ledger().wallet().dilithium;
        // Income is 1/s, so the reward takes the 20× multiplier.
        assert_eq!(s.collect_meteor(), Some(20));
        assert_eq!(s.ledger().wallet().dilithium, before + 20);
        assert_eq!(s.collect_meteor(), None);
        assert_eq!(s.ledger().wallet().dilithium, before + 20);
        assert_eq!(s.snapshot().meteors_caught, 1);
    }

    #[test]
    fn missed_meteor_pays_nothing() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(35));
        let before = s.ledger().wallet().dilithium;
        let mut frames = 0;
        loop {
            match s.frame() {
                FlightStatus::Traveling { .. } => frames += 1,
                FlightStatus::Missed => break,
                FlightStatus::Idle => panic!("meteor vanished mid-flight"),
            }
            assert!(frames < 10_000, "meteor never left the screen");
        }
        assert_eq!(s.meteor_phase(), MeteorPhase::Idle);
        assert_eq!(s.ledger().wallet().dilithium, before);
        assert_eq!(s.snapshot().meteors_missed, 1);
        assert_eq!(s.collect_meteor(), None);
    }

    #[test]
    fn reward_notice_self_clears() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(35));
        s.collect_meteor().unwrap();
        let notice = s.reward_notice().unwrap();
        assert_eq!(notice.amount, 20);
        s.advance(secs(36));
        assert!(s.reward_notice().is_some());
        s.advance(secs(38));
        assert!(s.reward_notice().is_none());
    }

    #[test]
    fn first_contact_fires_once() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.drain_signals();
        s.advance(secs(1));
        assert!(!s.drain_signals().contains(&GameSignal::ShowFirstContactDialog));
        s.advance(secs(2));
        let signals = s.drain_signals();
        assert_eq!(
            signals
                .iter()
                .filter(|&&sig| sig == GameSignal::ShowFirstContactDialog)
                .count(),
            1
        );
        assert!(s.snapshot().first_contact_shown);
        // A later passive purchase must not re-arm the gate.
        s.ledger.apply_reward(1_000);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(10));
        assert!(!s.drain_signals().contains(&GameSignal::ShowFirstContactDialog));
    }

    #[test]
    fn signals_are_emitted_in_order() {
        let mut s = session();
        for _ in 0..50 {
            s.tap();
        }
        s.purchase(&id("dilithium_extraction")).unwrap();
        let signals = s.drain_signals();
        assert_eq!(signals.len(), 51);
        assert!(signals[..50]
            .iter()
            .all(|&sig| sig == GameSignal::PlayClickSound));
        assert_eq!(signals[50], GameSignal::PlayUpgradeSound);
        assert!(s.drain_signals().is_empty());
    }

    #[test]
    fn trade_debits_and_credits_at_fixed_rate() {
        let mut s = session();
        s.ledger.apply_reward(100);
        let receipt = s.trade(100).unwrap();
        assert_eq!(receipt.coins_received, 1);
        assert_eq!(s.ledger().wallet().dilithium, 0);
        assert_eq!(s.ledger().wallet().coins, 1);
        assert_eq!(s.drain_signals(), vec![GameSignal::PlayUpgradeSound]);
    }

    #[test]
    fn failed_trade_mutates_nothing() {
        let mut s = session();
        s.ledger.apply_reward(50);
        let err = s.trade(100).unwrap_err();
        assert_eq!(
            err,
            EconError::InsufficientFunds {
                required: 100,
                available: 50
            }
        );
        assert_eq!(s.ledger().wallet().dilithium, 50);
        assert_eq!(s.ledger().wallet().coins, 0);
        assert_eq!(s.trade(0).unwrap_err(), EconError::InvalidAmount);
        assert!(s.drain_signals().is_empty());
    }

    #[test]
    fn dispose_stops_accrual_and_flight() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(35));
        assert!(matches!(s.meteor_phase(), MeteorPhase::Traveling { .. }));
        let balance = s.ledger().wallet().dilithium;

        s.dispose();
        s.dispose(); // release is idempotent
        s.advance(secs(3_600));
        assert_eq!(s.ledger().wallet().dilithium, balance);
        assert_eq!(s.frame(), FlightStatus::Idle);
        assert_eq!(s.collect_meteor(), None);
        assert_eq!(s.meteor_phase(), MeteorPhase::Idle);
    }

    #[test]
    fn accrual_clock_reports_whole_periods() {
        let mut clock = AccrualClock::start(secs(1));
        assert_eq!(clock.advance(Duration::from_millis(900)), 0);
        assert_eq!(clock.advance(Duration::from_millis(1_500)), 1);
        assert_eq!(clock.advance(Duration::from_millis(2_900)), 1);
        assert_eq!(clock.advance(secs(3)), 1);
        clock.stop();
        assert!(!clock.is_running());
        assert_eq!(clock.advance(secs(60)), 0);
    }

    #[test]
    fn time_never_runs_backwards() {
        let mut s = session();
        s.ledger.apply_reward(125);
        s.purchase(&id("passive_crystallization")).unwrap();
        s.advance(secs(10));
        s.advance(secs(5));
        assert_eq!(s.snapshot().elapsed, secs(10));
        assert_eq!(s.ledger().wallet().dilithium, 10);
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut s = session();
        for _ in 0..60 {
            s.tap();
        }
        s.purchase(&id("dilithium_extraction")).unwrap();
        s.advance(secs(3));
        let snap = s.snapshot();
        let json = serde_json::to_string_pretty(&snap).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dilithium, snap.dilithium);
        assert_eq!(back.total_click_power, 2);
        assert_eq!(back.upgrades.len(), 8);
        let line = back
            .upgrades
            .iter()
            .find(|u| u.id == id("dilithium_extraction"))
            .unwrap();
        assert_eq!(line.level, 1);
        assert_eq!(line.current_cost, 57);
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let run = || {
            let mut s = session();
            s.ledger.apply_reward(125);
            s.purchase(&id("passive_crystallization")).unwrap();
            s.advance(secs(35));
            s.meteor_phase()
        };
        let (a, b) = (run(), run());
        assert_eq!(a, b);
    }
}
