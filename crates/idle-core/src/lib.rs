#![deny(warnings)]

//! Core domain models and invariants for Forux Idle.
//!
//! This crate defines the serializable types shared across the game core with
//! validation helpers to guarantee basic invariants. All mutable session
//! state lives in `idle-runtime`; everything here is static data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a purchasable upgrade, e.g. "dilithium_extraction".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpgradeId(pub String);

/// What an upgrade level contributes to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EffectKind {
    /// Adds to dilithium gained per tap.
    ClickPower,
    /// Adds to dilithium gained per accrual second.
    PassiveIncome,
}

/// A static catalog entry describing one purchasable upgrade.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeDef {
    /// Upgrade identifier.
    pub id: UpgradeId,
    /// Localization key for the display name; the core never emits text.
    pub name_key: String,
    /// Which aggregate the upgrade feeds.
    pub effect: EffectKind,
    /// Amount added to the aggregate per purchased level.
    pub magnitude: u64,
    /// Cost of the first level in dilithium.
    pub base_cost: u64,
    /// Per-level cost multiplier (> 1).
    pub cost_growth: Decimal,
}

/// The immutable table of all purchasable upgrades.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog entries, unique by id.
    pub upgrades: Vec<UpgradeDef>,
}

/// Shared per-level cost multiplier across the standard catalog.
pub fn standard_cost_growth() -> Decimal {
    Decimal::new(115, 2)
}

impl Catalog {
    /// The canonical eight-upgrade catalog.
    pub fn standard() -> Self {
        let growth = standard_cost_growth();
        let def = |id: &str, name_key: &str, effect: EffectKind, magnitude: u64, base_cost: u64| {
            UpgradeDef {
                id: UpgradeId(id.to_string()),
                name_key: name_key.to_string(),
                effect,
                magnitude,
                base_cost,
                cost_growth: growth,
            }
        };
        Catalog {
            upgrades: vec![
                def(
                    "dilithium_extraction",
                    "upgrades_dilithiumExtraction",
                    EffectKind::ClickPower,
                    1,
                    50,
                ),
                def(
                    "passive_crystallization",
                    "upgrades_passiveCrystallization",
                    EffectKind::PassiveIncome,
                    1,
                    125,
                ),
                def(
                    "phase_resonator",
                    "upgrades_phaseResonator",
                    EffectKind::ClickPower,
                    5,
                    300,
                ),
                def(
                    "dilithium_conduit",
                    "upgrades_dilithiumConduit",
                    EffectKind::PassiveIncome,
                    6,
                    750,
                ),
                def(
                    "crystal_compressor",
                    "upgrades_crystalCompressor",
                    EffectKind::ClickPower,
                    100,
                    10_000,
                ),
                def(
                    "dilithium_cascade",
                    "upgrades_dilithiumCascade",
                    EffectKind::PassiveIncome,
                    200,
                    25_000,
                ),
                def(
                    "quantum_splitter",
                    "upgrades_quantumSplitter",
                    EffectKind::ClickPower,
                    1_000,
                    200_000,
                ),
                def(
                    "dilithium_matrix",
                    "upgrades_dilithiumMatrix",
                    EffectKind::PassiveIncome,
                    5_000,
                    500_000,
                ),
            ],
        }
    }

    /// Look up a definition by id.
    pub fn get(&self, id: &UpgradeId) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|d| &d.id == id)
    }
}

/// Resource balances. Debits are rejected up front, so fields never wrap.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wallet {
    /// Primary resource, mined by taps and passive accrual.
    pub dilithium: u64,
    /// Secondary resource, obtained only at the trading station.
    pub coins: u64,
}

/// Screen geometry the meteor scheduler spawns into. Reserved bands at the
/// top and bottom keep meteors clear of UI chrome.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in logical pixels.
    pub width: f32,
    /// Height in logical pixels.
    pub height: f32,
    /// Height of the reserved band at the top.
    pub top_reserved: f32,
    /// Height of the reserved band at the bottom.
    pub bottom_reserved: f32,
}

impl Viewport {
    /// Vertical range meteors may spawn in.
    pub fn safe_band(&self) -> (f32, f32) {
        (self.top_reserved, self.height - self.bottom_reserved)
    }
}

/// Session configuration. `Default` carries the canonical tuning values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Period of the passive accrual clock.
    pub accrual_period: Duration,
    /// Cadence of the idle-state meteor eligibility check.
    pub meteor_check_interval: Duration,
    /// Minimum dwell between meteor spawns.
    pub meteor_spawn_interval: Duration,
    /// Grace delay before the very first meteor may spawn.
    pub meteor_grace_delay: Duration,
    /// Reward is passive income times this multiplier.
    pub meteor_reward_multiplier: u64,
    /// Reward never drops below this floor.
    pub meteor_min_reward: u64,
    /// Horizontal distance a traveling meteor covers per frame.
    pub meteor_step: f32,
    /// How far off-screen a meteor starts and ends its flight.
    pub spawn_margin: f32,
    /// How long the "+amount" reward notice stays up.
    pub reward_notice_duration: Duration,
    /// Delay between the first passive upgrade and the first-contact dialog.
    pub first_contact_delay: Duration,
    /// Dilithium per coin at the trading station.
    pub trade_rate: u64,
    /// Seed for the deterministic meteor RNG.
    pub rng_seed: u64,
    /// Geometry meteors travel across.
    pub viewport: Viewport,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            accrual_period: Duration::from_secs(1),
            meteor_check_interval: Duration::from_secs(5),
            meteor_spawn_interval: Duration::from_secs(180),
            meteor_grace_delay: Duration::from_secs(30),
            meteor_reward_multiplier: 20,
            meteor_min_reward: 10,
            meteor_step: 8.0,
            spawn_margin: 64.0,
            reward_notice_duration: Duration::from_secs(2),
            first_contact_delay: Duration::from_millis(1_500),
            trade_rate: 100,
            rng_seed: 42,
            viewport: Viewport {
                width: 390.0,
                height: 844.0,
                top_reserved: 120.0,
                bottom_reserved: 140.0,
            },
        }
    }
}

/// Validation errors for static game data.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The catalog has no entries.
    #[error("upgrade catalog is empty")]
    EmptyCatalog,
    /// Two catalog entries share an id.
    #[error("duplicate upgrade id: {0}")]
    DuplicateUpgrade(String),
    /// An entry has an empty id or name key.
    #[error("upgrade {0} has an empty identifier field")]
    EmptyIdentifier(String),
    /// An entry adds nothing per level.
    #[error("upgrade {0} has zero magnitude")]
    ZeroMagnitude(String),
    /// An entry costs nothing.
    #[error("upgrade {0} has zero base cost")]
    ZeroCost(String),
    /// Cost growth must compound, i.e. be strictly greater than one.
    #[error("upgrade {0} has non-compounding cost growth")]
    NonCompoundingGrowth(String),
    /// The viewport leaves no vertical room for meteors.
    #[error("viewport reserved bands leave no safe spawn band")]
    EmptySafeBand,
    /// The trading station cannot exchange at a zero rate.
    #[error("trade rate must be positive")]
    ZeroTradeRate,
    /// A periodic process cannot run with a zero period.
    #[error("timer period must be positive")]
    ZeroPeriod,
}

/// Validate a catalog: entries present, ids unique, fields sane.
pub fn validate_catalog(catalog: &Catalog) -> Result<(), ValidationError> {
    if catalog.upgrades.is_empty() {
        return Err(ValidationError::EmptyCatalog);
    }
    let mut ids: BTreeSet<&UpgradeId> = BTreeSet::new();
    for def in &catalog.upgrades {
        if def.id.0.trim().is_empty() || def.name_key.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier(def.id.0.clone()));
        }
        if !ids.insert(&def.id) {
            return Err(ValidationError::DuplicateUpgrade(def.id.0.clone()));
        }
        if def.magnitude == 0 {
            return Err(ValidationError::ZeroMagnitude(def.id.0.clone()));
        }
        if def.base_cost == 0 {
            return Err(ValidationError::ZeroCost(def.id.0.clone()));
        }
        if def.cost_growth <= Decimal::ONE {
            return Err(ValidationError::NonCompoundingGrowth(def.id.0.clone()));
        }
    }
    Ok(())
}

/// Validate a session configuration.
pub fn validate_config(config: &GameConfig) -> Result<(), ValidationError> {
    if config.accrual_period.is_zero()
        || config.meteor_check_interval.is_zero()
        || config.meteor_spawn_interval.is_zero()
    {
        return Err(ValidationError::ZeroPeriod);
    }
    if config.trade_rate == 0 {
        return Err(ValidationError::ZeroTradeRate);
    }
    let (top, bottom) = config.viewport.safe_band();
    if !(top.is_finite() && bottom.is_finite()) || top >= bottom {
        return Err(ValidationError::EmptySafeBand);
    }
    Ok(())
}
