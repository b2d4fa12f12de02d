#![deny(warnings)]

//! Economic models: pricing, production and market dynamics for Brick Tycoon.
//!
//! Everything here is a pure function of the state it is handed plus, for the
//! stochastic parts, a [`RandomSource`]. This module provides:
//! - Geometric price schedules for upgrades and generators
//! - Unit price and sale revenue under the current market and event
//! - Manual output, automatic production rate and its material bound
//! - The biased demand random walk
//! - Economic event rolls and decay
//! - Generator yields and per-tick accrual
//! - Opportunity draws

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sim_core::catalog::{Opportunity, EVENT_CATALOG, OPPORTUNITY_CATALOG};
use sim_core::{
    round2, EconomicEvent, EventTemplate, Generator, GeneratorKind, Generators, Ledger,
    MarketState, ProductionLever, RandomSource, Trend, Upgrade, UpgradeKind, UpgradeRole,
    Upgrades, DEMAND_MAX, DEMAND_MIN, UPGRADE_PRICE_GROWTH,
};
use thiserror::Error;
use tracing::debug;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Growth factors must be finite and strictly greater than 1.
    #[error("invalid growth factor: {0}")]
    InvalidGrowth(f64),
    /// Price left the representable range.
    #[error("price overflow")]
    Overflow,
}

/// `floor(base * growth^n)`, computed in decimal arithmetic.
///
/// Example:
/// let p = geometric_price(Decimal::new(15_000, 0), 1.15, 2).unwrap();
/// assert_eq!(p, Decimal::new(19_837, 0));
pub fn geometric_price(base: Decimal, growth: f64, n: u32) -> Result<Decimal, EconError> {
    if !growth.is_finite() || growth <= 1.0 {
        return Err(EconError::InvalidGrowth(growth));
    }
    let g = Decimal::from_f64(growth).ok_or(EconError::InvalidGrowth(growth))?;
    let mut price = base;
    for _ in 0..n {
        price = price.checked_mul(g).ok_or(EconError::Overflow)?;
    }
    Ok(price.floor())
}

/// Price of the next unit of an upgrade. Saturates when unreachable.
pub fn upgrade_price(upgrade: &Upgrade) -> Decimal {
    geometric_price(upgrade.base_price, UPGRADE_PRICE_GROWTH, upgrade.owned).unwrap_or(Decimal::MAX)
}

/// Price of the next level of a generator. Saturates when unreachable.
pub fn generator_price(generator: &Generator) -> Decimal {
    geometric_price(generator.base_price, generator.price_growth, generator.level)
        .unwrap_or(Decimal::MAX)
}

fn factor(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap_or(Decimal::ZERO)
}

fn raw_unit_price(market: &MarketState, event: &EconomicEvent) -> Decimal {
    market.base_price * factor(market.price_multiplier) * factor(event.price_factor())
}

/// Live price of one brick, rounded to the cent.
pub fn unit_price(market: &MarketState, event: &EconomicEvent) -> Decimal {
    raw_unit_price(market, event).round_dp(2)
}

/// Revenue of selling `quantity` bricks: `round(unit_price * quantity)`.
pub fn sale_revenue(market: &MarketState, event: &EconomicEvent, quantity: u64) -> Decimal {
    (raw_unit_price(market, event) * Decimal::from(quantity)).round()
}

/// Per-brick clay and water costs after the active event's cost effect.
pub fn effective_costs(lever: &ProductionLever, event: &EconomicEvent) -> (f64, f64) {
    let f = event.cost_factor();
    (round2(lever.clay_cost * f), round2(lever.water_cost * f))
}

/// Bricks produced by one manual action.
pub fn manual_output(upgrades: &Upgrades, lever: &ProductionLever) -> f64 {
    let molds = &upgrades.molds;
    (1.0 + f64::from(molds.owned) * molds.unit_effect) * lever.efficiency
}

/// Bricks per tick of automatic production, before the material bound.
pub fn auto_rate(upgrades: &Upgrades, lever: &ProductionLever) -> f64 {
    let base: f64 = UpgradeKind::ALL
        .iter()
        .filter(|k| k.role() == UpgradeRole::AutoRate)
        .map(|k| {
            let u = upgrades.get(*k);
            f64::from(u.owned) * u.unit_effect
        })
        .sum();
    base * lever.efficiency
}

/// Whole bricks automatic production can make this tick:
/// `floor(min(clay / clay_cost, water / water_cost, rate))`.
pub fn auto_batch(ledger: &Ledger, costs: (f64, f64), rate: f64) -> f64 {
    let affordable = |stock: f64, cost: f64| {
        if cost > 0.0 {
            stock / cost
        } else {
            f64::INFINITY
        }
    };
    affordable(ledger.clay, costs.0)
        .min(affordable(ledger.water, costs.1))
        .min(rate)
        .floor()
        .max(0.0)
}

/// Unlock every upgrade whose threshold `total` has reached.
///
/// Returns the newly unlocked kinds in catalog order. Unlocks never revert.
pub fn scan_unlocks(upgrades: &mut Upgrades, total: f64) -> Vec<UpgradeKind> {
    let mut fresh = Vec::new();
    for kind in UpgradeKind::ALL {
        let u = upgrades.get_mut(kind);
        if !u.unlocked && total >= u.unlock_threshold {
            u.unlocked = true;
            fresh.push(kind);
        }
    }
    fresh
}

/// Price multiplier for a demand level: `round2(0.7 + demand / 100 * 0.6)`.
pub fn price_multiplier(demand: f64) -> f64 {
    round2(0.7 + demand / 100.0 * 0.6)
}

/// Outcome of one market update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarketUpdate {
    /// Trend before the update.
    pub previous: Trend,
    pub trend_changed: bool,
    /// Demand change applied before clamping.
    pub delta: f64,
}

/// Advance the demand random walk by one step.
///
/// Draw order: the trend-change roll, the replacement trend when the roll
/// hits, then the step size in `[1, 3]` (always drawn, even when stable).
pub fn update_market(
    market: &mut MarketState,
    event: &EconomicEvent,
    trend_change_chance: f64,
    rng: &mut dyn RandomSource,
) -> MarketUpdate {
    let previous = market.trend;
    if rng.chance(trend_change_chance) {
        let others = previous.others();
        market.trend = others[rng.index(others.len())];
    }
    let step = rng.int_inclusive(1, 3);
    let mut delta = f64::from(market.trend.sign() * step);
    if event.active && event.duration > 0 {
        delta += f64::from(event.demand_effect_pct) / (f64::from(event.duration) / 10.0);
    }
    let demand = if market.demand_level.is_finite() {
        market.demand_level + delta
    } else {
        sim_core::DEMAND_NEUTRAL
    };
    market.demand_level = demand.clamp(DEMAND_MIN, DEMAND_MAX);
    market.price_multiplier = price_multiplier(market.demand_level);
    debug!(
        demand = market.demand_level,
        trend = %market.trend,
        multiplier = market.price_multiplier,
        "market updated"
    );
    MarketUpdate {
        previous,
        trend_changed: market.trend != previous,
        delta,
    }
}

/// Roll for a new economic event.
///
/// Nothing is drawn while an event is active. Otherwise the chance roll comes
/// first; events only start for factories that have market insight.
pub fn roll_event(
    event: &EconomicEvent,
    insight_owned: bool,
    chance: f64,
    rng: &mut dyn RandomSource,
) -> Option<&'static EventTemplate> {
    if event.active {
        return None;
    }
    if !rng.chance(chance) || !insight_owned {
        return None;
    }
    EVENT_CATALOG.get(rng.index(EVENT_CATALOG.len()))
}

/// Count an active event down by one tick.
///
/// Returns `true` on the tick the event expires.
pub fn decay_event(event: &mut EconomicEvent) -> bool {
    if !event.active {
        return false;
    }
    event.remaining = event.remaining.saturating_sub(1);
    if event.remaining == 0 {
        event.active = false;
        return true;
    }
    false
}

/// Per-tick yield of a generator: `level * per_level_yield * progression^level`.
pub fn generator_output(generator: &Generator) -> f64 {
    let level = f64::from(generator.level);
    level * generator.per_level_yield * generator.progression.powf(level)
}

/// Clay and water credited this tick, or `None` while no generator is built.
///
/// Recycling feeds both stocks.
pub fn accrue(generators: &Generators) -> Option<(f64, f64)> {
    if !generators.any_active() {
        return None;
    }
    let out = |k: GeneratorKind| generator_output(generators.get(k));
    let recycling = out(GeneratorKind::Recycling);
    Some((
        round2(out(GeneratorKind::Excavator) + recycling),
        round2(out(GeneratorKind::Irrigation) + recycling),
    ))
}

/// Roll for a new opportunity among those not already offered.
///
/// No draw happens once `max_offered` opportunities are on the table.
pub fn roll_opportunity(
    offered: &[u32],
    max_offered: usize,
    chance: f64,
    rng: &mut dyn RandomSource,
) -> Option<&'static Opportunity> {
    if offered.len() >= max_offered || !rng.chance(chance) {
        return None;
    }
    let candidates: Vec<&'static Opportunity> = OPPORTUNITY_CATALOG
        .iter()
        .filter(|o| !offered.contains(&o.id))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.index(candidates.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::catalog::{default_generator, default_upgrade};
    use sim_core::ScriptedRng;

    #[test]
    fn upgrade_price_after_two_purchases() {
        let mut molds = default_upgrade(UpgradeKind::Molds);
        assert_eq!(upgrade_price(&molds), Decimal::new(15_000, 0));
        molds.owned = 1;
        assert_eq!(upgrade_price(&molds), Decimal::new(17_250, 0));
        molds.owned = 2;
        assert_eq!(upgrade_price(&molds), Decimal::new(19_837, 0));
    }

    #[test]
    fn invalid_growth_is_rejected() {
        assert_eq!(
            geometric_price(Decimal::ONE, 1.0, 3),
            Err(EconError::InvalidGrowth(1.0))
        );
        assert!(geometric_price(Decimal::ONE, f64::NAN, 3).is_err());
        let mut g = default_generator(GeneratorKind::Excavator);
        g.price_growth = 0.5;
        assert_eq!(generator_price(&g), Decimal::MAX);
    }

    #[test]
    fn generator_prices_grow() {
        let mut g = default_generator(GeneratorKind::Irrigation);
        assert_eq!(generator_price(&g), Decimal::new(250_000, 0));
        g.level = 2;
        assert_eq!(generator_price(&g), Decimal::new(422_500, 0));
    }

    #[test]
    fn level_three_excavator_yield() {
        let mut g = default_generator(GeneratorKind::Excavator);
        assert_eq!(generator_output(&g), 0.0);
        g.level = 3;
        assert_eq!(round2(generator_output(&g)), 1.04);
    }

    #[test]
    fn accrual_needs_a_generator() {
        let mut gens = Generators::default();
        assert_eq!(accrue(&gens), None);
        gens.recycling.level = 1;
        let (clay, water) = accrue(&gens).unwrap();
        assert_eq!(clay, water);
        assert_eq!(clay, round2(0.05 * 1.15));
    }

    #[test]
    fn neutral_unit_price() {
        let market = MarketState::default();
        let event = EconomicEvent::default();
        assert_eq!(unit_price(&market, &event), Decimal::new(1500, 0));
        assert_eq!(sale_revenue(&market, &event, 3), Decimal::new(4500, 0));
    }

    #[test]
    fn event_moves_price_and_costs() {
        let market = MarketState::default();
        let boom = EconomicEvent::start(&EVENT_CATALOG[0]);
        assert_eq!(unit_price(&market, &boom), Decimal::new(1950, 0));
        let shortage = EconomicEvent::start(&EVENT_CATALOG[2]);
        let costs = effective_costs(&ProductionLever::default(), &shortage);
        assert_eq!(costs, (1.2, 0.6));
    }

    #[test]
    fn manual_output_scales_with_molds_and_efficiency() {
        let mut upgrades = Upgrades::default();
        let lever = ProductionLever::default();
        assert_eq!(manual_output(&upgrades, &lever), 1.0);
        upgrades.molds.owned = 2;
        assert_eq!(manual_output(&upgrades, &lever), 2.0);
        let low = ProductionLever::at_level(50);
        assert_eq!(manual_output(&upgrades, &low), 2.0 * 0.71);
    }

    #[test]
    fn auto_rate_sums_automation_upgrades() {
        let mut upgrades = Upgrades::default();
        let lever = ProductionLever::default();
        assert_eq!(auto_rate(&upgrades, &lever), 0.0);
        upgrades.workers.owned = 3;
        upgrades.small_factory.owned = 1;
        upgrades.molds.owned = 5;
        upgrades.market_study.owned = 1;
        assert_eq!(auto_rate(&upgrades, &lever), 13.0);
    }

    #[test]
    fn auto_batch_is_bound_by_water() {
        let ledger = Ledger {
            clay: 10.0,
            water: 2.0,
            ..Ledger::default()
        };
        assert_eq!(auto_batch(&ledger, (1.0, 0.5), 13.0), 4.0);
        assert_eq!(auto_batch(&ledger, (1.0, 0.5), 2.5), 2.0);
        let dry = Ledger {
            water: 0.3,
            ..Ledger::default()
        };
        assert_eq!(auto_batch(&dry, (1.0, 0.5), 5.0), 0.0);
    }

    #[test]
    fn unlock_scan_reports_each_upgrade_once() {
        let mut upgrades = Upgrades::default();
        assert_eq!(scan_unlocks(&mut upgrades, 4.0), vec![]);
        assert_eq!(
            scan_unlocks(&mut upgrades, 60.0),
            vec![UpgradeKind::Molds, UpgradeKind::Workers]
        );
        assert_eq!(scan_unlocks(&mut upgrades, 60.0), vec![]);
        assert_eq!(scan_unlocks(&mut upgrades, 250.0), vec![UpgradeKind::MarketStudy]);
    }

    #[test]
    fn market_trend_change_consumes_three_draws() {
        let mut market = MarketState::default();
        let event = EconomicEvent::default();
        // roll hits, picks Rising (second of [Falling, Rising]), step 3
        let mut rng = ScriptedRng::new([0.1, 0.9, 0.9]);
        let up = update_market(&mut market, &event, 0.15, &mut rng);
        assert!(up.trend_changed);
        assert_eq!(market.trend, Trend::Rising);
        assert_eq!(market.demand_level, 103.0);
        assert_eq!(market.price_multiplier, 1.32);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn stable_market_still_draws_a_step() {
        let mut market = MarketState::default();
        let event = EconomicEvent::default();
        let mut rng = ScriptedRng::new([0.5, 0.0]);
        let up = update_market(&mut market, &event, 0.15, &mut rng);
        assert!(!up.trend_changed);
        assert_eq!(up.delta, 0.0);
        assert_eq!(market.demand_level, 100.0);
        assert_eq!(market.price_multiplier, 1.3);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn active_event_pushes_demand() {
        let mut market = MarketState::default();
        let boom = EconomicEvent::start(&EVENT_CATALOG[0]);
        let mut rng = ScriptedRng::quiet();
        let up = update_market(&mut market, &boom, 0.15, &mut rng);
        // 40% spread over 60 ticks / 10
        assert!((up.delta - 40.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn events_need_the_roll_and_market_insight() {
        let idle = EconomicEvent::default();
        let mut rng = ScriptedRng::new([0.01, 0.0]);
        assert_eq!(roll_event(&idle, false, 0.05, &mut rng), None);
        assert_eq!(rng.remaining(), 1);

        let mut rng = ScriptedRng::new([0.01, 0.0]);
        let drawn = roll_event(&idle, true, 0.05, &mut rng).map(|t| t.name);
        assert_eq!(drawn, Some(EVENT_CATALOG[0].name));

        let active = EconomicEvent::start(&EVENT_CATALOG[1]);
        let mut rng = ScriptedRng::new([0.0]);
        assert_eq!(roll_event(&active, true, 0.05, &mut rng), None);
        assert_eq!(rng.remaining(), 1);
    }

    #[test]
    fn event_expires_after_exactly_its_duration() {
        let template = &EVENT_CATALOG[2];
        let mut e = EconomicEvent::start(template);
        for _ in 1..template.duration {
            assert!(!decay_event(&mut e));
            assert!(e.active);
        }
        assert!(decay_event(&mut e));
        assert!(!e.active);
        assert_eq!(e.remaining, 0);
        assert!(!decay_event(&mut e));
    }

    #[test]
    fn opportunities_skip_offered_and_respect_the_cap() {
        let mut rng = ScriptedRng::new([0.0, 0.0]);
        let o = roll_opportunity(&[1], 3, 0.3, &mut rng).map(|o| o.id);
        assert_eq!(o, Some(2));

        let mut rng = ScriptedRng::new([0.0]);
        assert!(roll_opportunity(&[1, 2, 3], 3, 0.3, &mut rng).is_none());
        assert_eq!(rng.remaining(), 1);

        let mut rng = ScriptedRng::new([0.5]);
        assert!(roll_opportunity(&[], 3, 0.3, &mut rng).is_none());
    }

    proptest! {
        #[test]
        fn demand_stays_clamped(
            start in 70.0f64..=130.0,
            draws in proptest::collection::vec(0.0f64..1.0, 0..64),
            event_idx in proptest::option::of(0usize..9),
        ) {
            let mut market = MarketState { demand_level: start, ..MarketState::default() };
            let event = event_idx
                .map(|i| EconomicEvent::start(&EVENT_CATALOG[i]))
                .unwrap_or_default();
            let mut rng = ScriptedRng::new(draws).with_fallback(0.05);
            for _ in 0..40 {
                update_market(&mut market, &event, 0.15, &mut rng);
                prop_assert!((DEMAND_MIN..=DEMAND_MAX).contains(&market.demand_level));
                prop_assert!((1.12..=1.48).contains(&market.price_multiplier));
            }
        }

        #[test]
        fn auto_batch_never_overdraws(
            clay in 0.0f64..500.0,
            water in 0.0f64..500.0,
            level in 50i64..=150,
            rate in 0.0f64..200.0,
        ) {
            let lever = ProductionLever::at_level(level);
            let ledger = Ledger { clay, water, ..Ledger::default() };
            let n = auto_batch(&ledger, (lever.clay_cost, lever.water_cost), rate);
            prop_assert!(n >= 0.0);
            prop_assert!(n <= rate);
            prop_assert!(n * lever.clay_cost <= clay + 1e-9);
            prop_assert!(n * lever.water_cost <= water + 1e-9);
        }

        #[test]
        fn generator_output_strictly_increases(level in 0u32..40) {
            for kind in GeneratorKind::ALL {
                let mut g = default_generator(kind);
                g.level = level;
                let a = generator_output(&g);
                g.level = level + 1;
                prop_assert!(generator_output(&g) > a);
            }
        }

        #[test]
        fn upgrade_price_is_geometric(owned in 0u32..30) {
            let mut u = default_upgrade(UpgradeKind::Workers);
            u.owned = owned;
            let p = upgrade_price(&u);
            u.owned = owned + 1;
            prop_assert!(upgrade_price(&u) > p);
        }
    }
}
