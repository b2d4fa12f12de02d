#![deny(warnings)]

//! Core domain models and invariants for Brick Tycoon.
//!
//! This crate defines the serializable state of a brick factory session
//! (ledger, production lever, market, economic event, generators, upgrades),
//! the static catalogs the simulation draws from, and validation helpers
//! guaranteeing the basic invariants of a loaded snapshot.

pub mod catalog;
pub mod rng;
mod snapshot;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use catalog::{EventTemplate, Grant, Opportunity, ResourcePack};
#[cfg(any(test, feature = "test-utils"))]
pub use rng::ScriptedRng;
pub use rng::{RandomSource, SimRng};
pub use snapshot::{Snapshot, SNAPSHOT_FORMAT_VERSION};

/// Clay consumed per brick at lever level 100.
pub const BASE_CLAY_COST: f64 = 1.0;
/// Water consumed per brick at lever level 100.
pub const BASE_WATER_COST: f64 = 0.5;
/// Lower bound of the production lever, in percent.
pub const LEVER_MIN: u32 = 50;
/// Upper bound of the production lever, in percent.
pub const LEVER_MAX: u32 = 150;
/// Neutral lever setting.
pub const LEVER_DEFAULT: u32 = 100;
/// Demand level bounds and neutral point.
pub const DEMAND_MIN: f64 = 70.0;
pub const DEMAND_MAX: f64 = 130.0;
pub const DEMAND_NEUTRAL: f64 = 100.0;
/// Base selling price of one brick in GNF.
pub const BASE_BRICK_PRICE: i64 = 1500;
/// Geometric inflation applied to every upgrade purchase.
pub const UPGRADE_PRICE_GROWTH: f64 = 1.15;

/// Round to two decimal places, the precision used for lever and market values.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Anything the ledger can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Bricks,
    Clay,
    Water,
    Funds,
}

/// Raw materials consumed by production.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawMaterial {
    Clay,
    Water,
}

impl fmt::Display for RawMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawMaterial::Clay => f.write_str("clay"),
            RawMaterial::Water => f.write_str("water"),
        }
    }
}

/// Quantities of materials, goods and money held by the factory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ledger {
    /// Finished bricks in stock.
    pub bricks: f64,
    /// Clay in stock.
    pub clay: f64,
    /// Water in stock.
    pub water: f64,
    /// Available funds in GNF.
    pub funds: Decimal,
    /// Number of manual production actions.
    pub bricks_made_manually: u64,
    /// Cumulative bricks produced, manual and automatic.
    pub bricks_made_total: f64,
    /// Production steps performed; drives the progress meter.
    pub progress: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            bricks: 0.0,
            clay: 100.0,
            water: 100.0,
            funds: Decimal::ZERO,
            bricks_made_manually: 0,
            bricks_made_total: 0.0,
            progress: 0,
        }
    }
}

impl Ledger {
    /// Current stock of a raw material.
    pub fn raw(&self, material: RawMaterial) -> f64 {
        match material {
            RawMaterial::Clay => self.clay,
            RawMaterial::Water => self.water,
        }
    }

    /// Mutable access to the stock of a raw material.
    pub fn raw_mut(&mut self, material: RawMaterial) -> &mut f64 {
        match material {
            RawMaterial::Clay => &mut self.clay,
            RawMaterial::Water => &mut self.water,
        }
    }

    /// Credit a fixed grant. This is the single resolver for opportunity effects.
    pub fn apply_grant(&mut self, grant: &Grant) {
        let amount = f64::from(grant.amount);
        match grant.resource {
            ResourceKind::Bricks => self.bricks += amount,
            ResourceKind::Clay => self.clay += amount,
            ResourceKind::Water => self.water += amount,
            ResourceKind::Funds => self.funds += Decimal::from(grant.amount),
        }
    }
}

/// Trade-off between material consumption and production efficiency.
///
/// `clay_cost`, `water_cost` and `efficiency` are derived from `level` and
/// stored rounded to two decimals; use [`ProductionLever::at_level`] to build
/// one so they never drift apart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionLever {
    /// Lever position in percent, within [`LEVER_MIN`, `LEVER_MAX`].
    pub level: u32,
    /// Clay consumed per brick.
    pub clay_cost: f64,
    /// Water consumed per brick.
    pub water_cost: f64,
    /// Output multiplier.
    pub efficiency: f64,
}

impl Default for ProductionLever {
    fn default() -> Self {
        Self::at_level(i64::from(LEVER_DEFAULT))
    }
}

impl ProductionLever {
    /// Build a lever at `level`, clamped to [50, 150].
    pub fn at_level(level: i64) -> Self {
        let level = level.clamp(i64::from(LEVER_MIN), i64::from(LEVER_MAX)) as u32;
        let (clay_cost, water_cost) = Self::cost_curve(level);
        Self {
            level,
            clay_cost: round2(clay_cost),
            water_cost: round2(water_cost),
            efficiency: round2(Self::efficiency_curve(level)),
        }
    }

    /// Unrounded efficiency: `sqrt(level / 100)`.
    pub fn efficiency_curve(level: u32) -> f64 {
        (f64::from(level) / 100.0).sqrt()
    }

    /// Unrounded per-brick costs: base costs scaled linearly by `level / 100`.
    pub fn cost_curve(level: u32) -> (f64, f64) {
        let scale = f64::from(level) / 100.0;
        (BASE_CLAY_COST * scale, BASE_WATER_COST * scale)
    }
}

/// Direction of the demand random walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Trend {
    Falling,
    #[default]
    Stable,
    Rising,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Falling, Trend::Stable, Trend::Rising];

    /// Signed step direction: -1, 0 or 1.
    pub fn sign(self) -> i32 {
        match self {
            Trend::Falling => -1,
            Trend::Stable => 0,
            Trend::Rising => 1,
        }
    }

    /// The two trends different from `self`, in ascending order.
    pub fn others(self) -> [Trend; 2] {
        match self {
            Trend::Falling => [Trend::Stable, Trend::Rising],
            Trend::Stable => [Trend::Falling, Trend::Rising],
            Trend::Rising => [Trend::Falling, Trend::Stable],
        }
    }
}

impl From<Trend> for i8 {
    fn from(t: Trend) -> i8 {
        t.sign() as i8
    }
}

impl TryFrom<i8> for Trend {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Trend::Falling),
            0 => Ok(Trend::Stable),
            1 => Ok(Trend::Rising),
            other => Err(format!("trend must be -1, 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Falling => f.write_str("falling"),
            Trend::Stable => f.write_str("stable"),
            Trend::Rising => f.write_str("rising"),
        }
    }
}

/// Demand level, trend and the price multiplier derived from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketState {
    /// Demand in [70, 130]; 100 is neutral.
    pub demand_level: f64,
    pub trend: Trend,
    /// Base brick price in GNF (constant).
    pub base_price: Decimal,
    /// `round2(0.7 + demand_level / 100 * 0.6)`.
    pub price_multiplier: f64,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            demand_level: DEMAND_NEUTRAL,
            trend: Trend::Stable,
            base_price: Decimal::from(BASE_BRICK_PRICE),
            price_multiplier: 1.0,
        }
    }
}

/// Category of an economic event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Economic,
    Political,
    Environmental,
    Commercial,
    Competition,
    Social,
}

/// The (at most one) economic event currently shaping the market.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicEvent {
    pub active: bool,
    pub kind: Option<EventKind>,
    pub name: String,
    pub description: String,
    /// Effect on the selling price, in percent.
    pub price_effect_pct: i32,
    /// Effect on demand, in percent, spread over the event duration.
    pub demand_effect_pct: i32,
    /// Effect on per-brick material costs, in percent.
    pub cost_effect_pct: i32,
    /// Total duration in ticks (seconds).
    pub duration: u32,
    /// Ticks left before the event expires.
    pub remaining: u32,
}

impl EconomicEvent {
    /// An active event instantiated from a catalog template.
    pub fn start(template: &EventTemplate) -> Self {
        Self {
            active: true,
            kind: Some(template.kind),
            name: template.name.to_string(),
            description: template.description.to_string(),
            price_effect_pct: template.price_effect_pct,
            demand_effect_pct: template.demand_effect_pct,
            cost_effect_pct: template.cost_effect_pct,
            duration: template.duration,
            remaining: template.duration,
        }
    }

    /// Multiplier applied to the unit price while active.
    pub fn price_factor(&self) -> f64 {
        if self.active {
            1.0 + f64::from(self.price_effect_pct) / 100.0
        } else {
            1.0
        }
    }

    /// Multiplier applied to per-brick material costs while active.
    pub fn cost_factor(&self) -> f64 {
        if self.active {
            1.0 + f64::from(self.cost_effect_pct) / 100.0
        } else {
            1.0
        }
    }
}

/// The three automatic raw-material producers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Clay extraction.
    Excavator,
    /// Water supply.
    Irrigation,
    /// Brick recycling; yields clay and water.
    Recycling,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 3] = [
        GeneratorKind::Excavator,
        GeneratorKind::Irrigation,
        GeneratorKind::Recycling,
    ];
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorKind::Excavator => f.write_str("clay excavator"),
            GeneratorKind::Irrigation => f.write_str("irrigation"),
            GeneratorKind::Recycling => f.write_str("brick recycling"),
        }
    }
}

/// A leveled raw-material producer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    #[serde(default)]
    pub level: u32,
    /// Yield per level per tick before the progression bonus.
    pub per_level_yield: f64,
    /// Price of the first level in GNF.
    pub base_price: Decimal,
    /// Price multiplier per level already bought.
    pub price_growth: f64,
    /// Output multiplier per level (superlinear reward curve).
    pub progression: f64,
}

/// All generators of a factory.
///
/// Entries missing from serialized input, or missing some of their fields,
/// fall back to the catalog values field by field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "GeneratorsPatch")]
pub struct Generators {
    pub excavator: Generator,
    pub irrigation: Generator,
    pub recycling: Generator,
}

impl Default for Generators {
    fn default() -> Self {
        Self {
            excavator: catalog::default_generator(GeneratorKind::Excavator),
            irrigation: catalog::default_generator(GeneratorKind::Irrigation),
            recycling: catalog::default_generator(GeneratorKind::Recycling),
        }
    }
}

#[derive(Default, Deserialize)]
struct GeneratorPatch {
    level: Option<u32>,
    per_level_yield: Option<f64>,
    base_price: Option<Decimal>,
    price_growth: Option<f64>,
    progression: Option<f64>,
}

impl GeneratorPatch {
    fn over(self, kind: GeneratorKind) -> Generator {
        let base = catalog::default_generator(kind);
        Generator {
            level: self.level.unwrap_or(base.level),
            per_level_yield: self.per_level_yield.unwrap_or(base.per_level_yield),
            base_price: self.base_price.unwrap_or(base.base_price),
            price_growth: self.price_growth.unwrap_or(base.price_growth),
            progression: self.progression.unwrap_or(base.progression),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct GeneratorsPatch {
    excavator: GeneratorPatch,
    irrigation: GeneratorPatch,
    recycling: GeneratorPatch,
}

impl From<GeneratorsPatch> for Generators {
    fn from(p: GeneratorsPatch) -> Self {
        Self {
            excavator: p.excavator.over(GeneratorKind::Excavator),
            irrigation: p.irrigation.over(GeneratorKind::Irrigation),
            recycling: p.recycling.over(GeneratorKind::Recycling),
        }
    }
}

impl Generators {
    pub fn get(&self, kind: GeneratorKind) -> &Generator {
        match kind {
            GeneratorKind::Excavator => &self.excavator,
            GeneratorKind::Irrigation => &self.irrigation,
            GeneratorKind::Recycling => &self.recycling,
        }
    }

    pub fn get_mut(&mut self, kind: GeneratorKind) -> &mut Generator {
        match kind {
            GeneratorKind::Excavator => &mut self.excavator,
            GeneratorKind::Irrigation => &mut self.irrigation,
            GeneratorKind::Recycling => &mut self.recycling,
        }
    }

    /// True when at least one generator has been built.
    pub fn any_active(&self) -> bool {
        GeneratorKind::ALL.iter().any(|k| self.get(*k).level > 0)
    }
}

/// Purchasable upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Molds,
    Workers,
    SmallFactory,
    LargeFactory,
    MarketStudy,
    ProductionOptimization,
    ResourceManagement,
}

/// Non-numeric effects unlocked by an upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeEffect {
    /// Trend notifications and economic events.
    MarketInsight,
    /// Lever optimization.
    LeverOptimization,
    /// Generator management.
    GeneratorManagement,
}

/// How an upgrade contributes to the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeRole {
    /// Extra bricks per manual action.
    ManualOutput,
    /// Bricks per tick of automatic production.
    AutoRate,
    Effect(UpgradeEffect),
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 7] = [
        UpgradeKind::Molds,
        UpgradeKind::Workers,
        UpgradeKind::SmallFactory,
        UpgradeKind::LargeFactory,
        UpgradeKind::MarketStudy,
        UpgradeKind::ProductionOptimization,
        UpgradeKind::ResourceManagement,
    ];

    pub fn role(self) -> UpgradeRole {
        match self {
            UpgradeKind::Molds => UpgradeRole::ManualOutput,
            UpgradeKind::Workers | UpgradeKind::SmallFactory | UpgradeKind::LargeFactory => {
                UpgradeRole::AutoRate
            }
            UpgradeKind::MarketStudy => UpgradeRole::Effect(UpgradeEffect::MarketInsight),
            UpgradeKind::ProductionOptimization => {
                UpgradeRole::Effect(UpgradeEffect::LeverOptimization)
            }
            UpgradeKind::ResourceManagement => {
                UpgradeRole::Effect(UpgradeEffect::GeneratorManagement)
            }
        }
    }
}

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpgradeKind::Molds => "molds",
            UpgradeKind::Workers => "workers",
            UpgradeKind::SmallFactory => "small factory",
            UpgradeKind::LargeFactory => "large factory",
            UpgradeKind::MarketStudy => "market study",
            UpgradeKind::ProductionOptimization => "production optimization",
            UpgradeKind::ResourceManagement => "resource management",
        };
        f.write_str(name)
    }
}

/// Ownership and pricing of one upgrade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    #[serde(default)]
    pub owned: u32,
    /// Price of the first unit in GNF.
    pub base_price: Decimal,
    /// Contribution per owned unit (bricks per click or per tick).
    pub unit_effect: f64,
    /// Cumulative bricks needed before the upgrade can be bought.
    pub unlock_threshold: f64,
    /// Set once the threshold is reached; never reverts.
    #[serde(default)]
    pub unlocked: bool,
}

/// The full upgrade catalog with ownership counts.
///
/// Deserializes like [`Generators`]: absent entries and fields take the
/// catalog values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "UpgradesPatch")]
pub struct Upgrades {
    pub molds: Upgrade,
    pub workers: Upgrade,
    pub small_factory: Upgrade,
    pub large_factory: Upgrade,
    pub market_study: Upgrade,
    pub production_optimization: Upgrade,
    pub resource_management: Upgrade,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            molds: catalog::default_upgrade(UpgradeKind::Molds),
            workers: catalog::default_upgrade(UpgradeKind::Workers),
            small_factory: catalog::default_upgrade(UpgradeKind::SmallFactory),
            large_factory: catalog::default_upgrade(UpgradeKind::LargeFactory),
            market_study: catalog::default_upgrade(UpgradeKind::MarketStudy),
            production_optimization: catalog::default_upgrade(
                UpgradeKind::ProductionOptimization,
            ),
            resource_management: catalog::default_upgrade(UpgradeKind::ResourceManagement),
        }
    }
}

#[derive(Default, Deserialize)]
struct UpgradePatch {
    owned: Option<u32>,
    base_price: Option<Decimal>,
    unit_effect: Option<f64>,
    unlock_threshold: Option<f64>,
    unlocked: Option<bool>,
}

impl UpgradePatch {
    fn over(self, kind: UpgradeKind) -> Upgrade {
        let base = catalog::default_upgrade(kind);
        Upgrade {
            owned: self.owned.unwrap_or(base.owned),
            base_price: self.base_price.unwrap_or(base.base_price),
            unit_effect: self.unit_effect.unwrap_or(base.unit_effect),
            unlock_threshold: self.unlock_threshold.unwrap_or(base.unlock_threshold),
            unlocked: self.unlocked.unwrap_or(base.unlocked),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct UpgradesPatch {
    molds: UpgradePatch,
    workers: UpgradePatch,
    small_factory: UpgradePatch,
    large_factory: UpgradePatch,
    market_study: UpgradePatch,
    production_optimization: UpgradePatch,
    resource_management: UpgradePatch,
}

impl From<UpgradesPatch> for Upgrades {
    fn from(p: UpgradesPatch) -> Self {
        Self {
            molds: p.molds.over(UpgradeKind::Molds),
            workers: p.workers.over(UpgradeKind::Workers),
            small_factory: p.small_factory.over(UpgradeKind::SmallFactory),
            large_factory: p.large_factory.over(UpgradeKind::LargeFactory),
            market_study: p.market_study.over(UpgradeKind::MarketStudy),
            production_optimization: p
                .production_optimization
                .over(UpgradeKind::ProductionOptimization),
            resource_management: p.resource_management.over(UpgradeKind::ResourceManagement),
        }
    }
}

impl Upgrades {
    pub fn get(&self, kind: UpgradeKind) -> &Upgrade {
        match kind {
            UpgradeKind::Molds => &self.molds,
            UpgradeKind::Workers => &self.workers,
            UpgradeKind::SmallFactory => &self.small_factory,
            UpgradeKind::LargeFactory => &self.large_factory,
            UpgradeKind::MarketStudy => &self.market_study,
            UpgradeKind::ProductionOptimization => &self.production_optimization,
            UpgradeKind::ResourceManagement => &self.resource_management,
        }
    }

    pub fn get_mut(&mut self, kind: UpgradeKind) -> &mut Upgrade {
        match kind {
            UpgradeKind::Molds => &mut self.molds,
            UpgradeKind::Workers => &mut self.workers,
            UpgradeKind::SmallFactory => &mut self.small_factory,
            UpgradeKind::LargeFactory => &mut self.large_factory,
            UpgradeKind::MarketStudy => &mut self.market_study,
            UpgradeKind::ProductionOptimization => &mut self.production_optimization,
            UpgradeKind::ResourceManagement => &mut self.resource_management,
        }
    }

    /// Whether at least one unit with the given effect is owned.
    pub fn has_effect(&self, effect: UpgradeEffect) -> bool {
        UpgradeKind::ALL
            .iter()
            .any(|k| k.role() == UpgradeRole::Effect(effect) && self.get(*k).owned > 0)
    }
}

/// Development stage of the factory, derived from what has been built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryStage {
    /// Nothing produced yet.
    Initial,
    /// Manual production only.
    Production,
    /// Workers hired.
    Automation,
    /// A small factory runs.
    Factory,
    /// A large factory runs.
    Expansion,
}

impl FactoryStage {
    pub fn of(ledger: &Ledger, upgrades: &Upgrades) -> Self {
        if upgrades.large_factory.owned > 0 {
            FactoryStage::Expansion
        } else if upgrades.small_factory.owned > 0 {
            FactoryStage::Factory
        } else if upgrades.workers.owned > 0 {
            FactoryStage::Automation
        } else if ledger.bricks_made_total > 0.0 {
            FactoryStage::Production
        } else {
            FactoryStage::Initial
        }
    }
}

impl fmt::Display for FactoryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FactoryStage::Initial => "initial",
            FactoryStage::Production => "production",
            FactoryStage::Automation => "automation",
            FactoryStage::Factory => "factory",
            FactoryStage::Expansion => "expansion",
        };
        f.write_str(s)
    }
}

/// Simulation configuration parameters.
///
/// Periods are in ticks (one tick is one nominal second); chances are
/// probabilities in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// Ticks between market updates.
    pub market_period: u64,
    /// Ticks between economic event checks.
    pub event_period: u64,
    /// Ticks between autosaves.
    pub save_period: u64,
    /// Ticks during which no new opportunity may appear after one spawned.
    pub opportunity_cooldown: u64,
    pub trend_change_chance: f64,
    pub event_chance: f64,
    pub opportunity_chance: f64,
    /// Maximum opportunities offered at once.
    pub max_offered_opportunities: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            market_period: 15,
            event_period: 30,
            save_period: 30,
            opportunity_cooldown: 30,
            trend_change_chance: 0.15,
            event_chance: 0.05,
            opportunity_chance: 0.30,
            max_offered_opportunities: 3,
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    /// Stocks and funds must be non-negative.
    #[error("negative quantity in {0}")]
    Negative(&'static str),
    /// Lever outside [50, 150] or derived fields out of sync.
    #[error("lever level {0} is invalid or its derived values drifted")]
    LeverDrift(u32),
    /// Demand outside [70, 130].
    #[error("demand level {0} outside [70, 130]")]
    DemandOutOfRange(f64),
    /// Active event with more time left than its duration.
    #[error("event remaining {remaining} exceeds duration {duration}")]
    EventClock { remaining: u32, duration: u32 },
    /// Upgrade locked although the production total passed its threshold.
    #[error("upgrade {0} should be unlocked")]
    StaleUnlock(UpgradeKind),
    /// Growth factors must exceed 1.
    #[error("growth factor of {0} must be > 1")]
    Growth(GeneratorKind),
}

/// Validate ledger stocks.
pub fn validate_ledger(l: &Ledger) -> Result<(), ValidationError> {
    for (name, v) in [
        ("bricks", l.bricks),
        ("clay", l.clay),
        ("water", l.water),
        ("bricks_made_total", l.bricks_made_total),
    ] {
        if !v.is_finite() {
            return Err(ValidationError::NonFinite(name));
        }
        if v < 0.0 {
            return Err(ValidationError::Negative(name));
        }
    }
    if l.funds < Decimal::ZERO {
        return Err(ValidationError::Negative("funds"));
    }
    Ok(())
}

/// Validate that the lever is in range and its derived values match its level.
pub fn validate_lever(lever: &ProductionLever) -> Result<(), ValidationError> {
    if lever != &ProductionLever::at_level(i64::from(lever.level)) {
        return Err(ValidationError::LeverDrift(lever.level));
    }
    Ok(())
}

/// Validate market bounds.
pub fn validate_market(m: &MarketState) -> Result<(), ValidationError> {
    if !m.demand_level.is_finite() || !m.price_multiplier.is_finite() {
        return Err(ValidationError::NonFinite("market"));
    }
    if !(DEMAND_MIN..=DEMAND_MAX).contains(&m.demand_level) {
        return Err(ValidationError::DemandOutOfRange(m.demand_level));
    }
    if m.base_price < Decimal::ZERO {
        return Err(ValidationError::Negative("base_price"));
    }
    Ok(())
}

/// Validate the event clock.
pub fn validate_event(e: &EconomicEvent) -> Result<(), ValidationError> {
    if e.active && e.remaining > e.duration {
        return Err(ValidationError::EventClock {
            remaining: e.remaining,
            duration: e.duration,
        });
    }
    Ok(())
}

/// Validate a full snapshot, including cross-references like unlock flags.
pub fn validate_snapshot(s: &Snapshot) -> Result<(), ValidationError> {
    validate_ledger(&s.ledger)?;
    validate_lever(&s.lever)?;
    validate_market(&s.market)?;
    validate_event(&s.event)?;
    for kind in GeneratorKind::ALL {
        let g = s.generators.get(kind);
        if !(g.price_growth > 1.0 && g.progression > 1.0) {
            return Err(ValidationError::Growth(kind));
        }
    }
    for kind in UpgradeKind::ALL {
        let u = s.upgrades.get(kind);
        if !u.unlocked && s.ledger.bricks_made_total >= u.unlock_threshold {
            return Err(ValidationError::StaleUnlock(kind));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_ledger_matches_starting_values() {
        let l = Ledger::default();
        assert_eq!(l.bricks, 0.0);
        assert_eq!(l.clay, 100.0);
        assert_eq!(l.water, 100.0);
        assert_eq!(l.funds, Decimal::ZERO);
        assert!(validate_ledger(&l).is_ok());
    }

    #[test]
    fn lever_clamps_high_values() {
        let lever = ProductionLever::at_level(200);
        assert_eq!(lever.level, 150);
        assert!((ProductionLever::efficiency_curve(150) - 1.2247).abs() < 1e-4);
        assert_eq!(lever.efficiency, 1.22);
        assert_eq!(lever.clay_cost, 1.5);
        assert_eq!(lever.water_cost, 0.75);
    }

    #[test]
    fn lever_clamps_low_values() {
        let lever = ProductionLever::at_level(-10);
        assert_eq!(lever.level, 50);
        assert_eq!(lever.efficiency, 0.71);
        assert_eq!(lever.clay_cost, 0.5);
        assert_eq!(lever.water_cost, 0.25);
    }

    #[test]
    fn default_lever_is_neutral() {
        let lever = ProductionLever::default();
        assert_eq!(lever.level, 100);
        assert_eq!(lever.efficiency, 1.0);
        assert_eq!(lever.clay_cost, BASE_CLAY_COST);
        assert_eq!(lever.water_cost, BASE_WATER_COST);
    }

    #[test]
    fn trend_serializes_as_sign() {
        assert_eq!(serde_json::to_string(&Trend::Falling).unwrap(), "-1");
        let t: Trend = serde_json::from_str("1").unwrap();
        assert_eq!(t, Trend::Rising);
        assert!(serde_json::from_str::<Trend>("2").is_err());
    }

    #[test]
    fn trend_others_excludes_self() {
        for t in Trend::ALL {
            assert!(!t.others().contains(&t));
        }
    }

    #[test]
    fn grants_credit_the_named_resource() {
        let mut l = Ledger::default();
        l.apply_grant(&Grant {
            resource: ResourceKind::Funds,
            amount: 100_000,
        });
        l.apply_grant(&Grant {
            resource: ResourceKind::Bricks,
            amount: 20,
        });
        assert_eq!(l.funds, Decimal::new(100_000, 0));
        assert_eq!(l.bricks, 20.0);
        assert_eq!(l.clay, 100.0);
    }

    #[test]
    fn event_factors_only_apply_while_active() {
        let template = &catalog::EVENT_CATALOG[0];
        let mut e = EconomicEvent::start(template);
        assert!((e.price_factor() - 1.30).abs() < 1e-9);
        e.active = false;
        assert_eq!(e.price_factor(), 1.0);
        assert_eq!(e.cost_factor(), 1.0);
    }

    #[test]
    fn stage_follows_automation() {
        let mut l = Ledger::default();
        let mut u = Upgrades::default();
        assert_eq!(FactoryStage::of(&l, &u), FactoryStage::Initial);
        l.bricks_made_total = 3.0;
        assert_eq!(FactoryStage::of(&l, &u), FactoryStage::Production);
        u.workers.owned = 1;
        assert_eq!(FactoryStage::of(&l, &u), FactoryStage::Automation);
        u.large_factory.owned = 1;
        assert_eq!(FactoryStage::of(&l, &u), FactoryStage::Expansion);
    }

    #[test]
    fn effect_lookup_requires_ownership() {
        let mut u = Upgrades::default();
        assert!(!u.has_effect(UpgradeEffect::MarketInsight));
        u.market_study.owned = 1;
        assert!(u.has_effect(UpgradeEffect::MarketInsight));
        assert!(!u.has_effect(UpgradeEffect::GeneratorManagement));
    }

    #[test]
    fn stale_unlock_is_reported() {
        let mut s = Snapshot::default();
        assert!(validate_snapshot(&s).is_ok());
        s.ledger.bricks_made_total = 60.0;
        assert_eq!(
            validate_snapshot(&s),
            Err(ValidationError::StaleUnlock(UpgradeKind::Molds))
        );
    }

    #[test]
    fn drifted_lever_is_reported() {
        let mut lever = ProductionLever::at_level(120);
        lever.clay_cost = 9.0;
        assert_eq!(validate_lever(&lever), Err(ValidationError::LeverDrift(120)));
    }

    proptest! {
        #[test]
        fn lever_curves_are_exact(level in 50u32..=150) {
            let expected = (level as f64 / 100.0).sqrt();
            prop_assert_eq!(ProductionLever::efficiency_curve(level), expected);
            let (clay, water) = ProductionLever::cost_curve(level);
            prop_assert_eq!(clay, BASE_CLAY_COST * (level as f64 / 100.0));
            prop_assert_eq!(water, BASE_WATER_COST * (level as f64 / 100.0));
        }

        #[test]
        fn lever_is_always_in_range(level in -1_000i64..1_000) {
            let lever = ProductionLever::at_level(level);
            prop_assert!((LEVER_MIN..=LEVER_MAX).contains(&lever.level));
            prop_assert!(validate_lever(&lever).is_ok());
        }
    }
}
