//! The player session: actions, the tick loop and autosave.

use crate::error::ActionError;
use crate::notify::{Level, Notification, Outbox};
use crate::state::SimState;
use chrono::Utc;
use persistence::{load_or_default, PersistError, SnapshotStore};
use rust_decimal::Decimal;
use sim_core::catalog::{self, Opportunity};
use sim_core::{
    round2, EconomicEvent, GeneratorKind, ProductionLever, RandomSource, RawMaterial,
    ResourcePack, SimConfig, SimRng, Snapshot, UpgradeEffect, UpgradeKind,
};
use sim_econ::{
    accrue, auto_batch, auto_rate, generator_price, manual_output, roll_event, roll_opportunity,
    sale_revenue, scan_unlocks, update_market, upgrade_price,
};
use tracing::{debug, info, warn};

const WELCOME: &str = "Welcome to your brick factory";
const WELCOME_BACK: &str = "Welcome back to your brick factory";

/// A running game.
///
/// Generic over its snapshot store and random source; live sessions use
/// [`SimRng`] seeded from the config.
pub struct Session<S, R = SimRng> {
    state: SimState,
    config: SimConfig,
    rng: R,
    store: S,
    notifications: Vec<Notification>,
}

impl<S: SnapshotStore> Session<S> {
    /// Start a fresh game.
    pub fn new(config: SimConfig, store: S) -> Self {
        let rng = SimRng::seed_from_u64(config.rng_seed);
        Self::with_rng(config, store, rng)
    }

    /// Continue the game saved in `store`, or start fresh if there is none.
    pub fn resume(config: SimConfig, mut store: S) -> Result<Self, PersistError> {
        let snap = load_or_default(&mut store)?;
        let rng = SimRng::seed_from_u64(config.rng_seed);
        Ok(Self::from_snapshot(config, store, rng, snap))
    }
}

impl<S: SnapshotStore, R: RandomSource> Session<S, R> {
    pub fn with_rng(config: SimConfig, store: S, rng: R) -> Self {
        Self::from_snapshot(config, store, rng, Snapshot::default())
    }

    pub fn from_snapshot(config: SimConfig, store: S, rng: R, snapshot: Snapshot) -> Self {
        let welcome = if snapshot.tick > 0 { WELCOME_BACK } else { WELCOME };
        let state = SimState::from_snapshot(snapshot, &config);
        info!(tick = state.clock.tick(), stage = %state.stage(), "session started");
        let mut session = Self {
            state,
            config,
            rng,
            store,
            notifications: Vec::new(),
        };
        session.notify(Level::Info, welcome);
        session
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tick(&self) -> u64 {
        self.state.clock.tick()
    }

    /// Take every notification raised since the last call.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn offered_opportunities(&self) -> Vec<&'static Opportunity> {
        self.state
            .offered
            .iter()
            .filter_map(|id| catalog::opportunity(*id))
            .collect()
    }

    fn notify(&mut self, level: Level, message: impl Into<String>) {
        let mut out = Outbox::default();
        out.push(level, message);
        self.publish(out);
    }

    fn publish(&mut self, out: Outbox) {
        let tick = self.state.clock.tick();
        self.notifications.extend(out.stamp(tick));
    }

    /// Run `action` on a copy of the state and install it on success.
    ///
    /// On failure the state is untouched and a single error notification
    /// carries the error message.
    fn apply<T>(
        &mut self,
        action: impl FnOnce(&mut SimState, &mut Outbox) -> Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        let mut next = self.state.clone();
        let mut out = Outbox::default();
        match action(&mut next, &mut out) {
            Ok(value) => {
                self.state = next;
                self.publish(out);
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "action rejected");
                self.notify(Level::Error, err.to_string());
                Err(err)
            }
        }
    }

    /// Make bricks by hand. Returns the number of bricks made.
    pub fn make_brick(&mut self) -> Result<f64, ActionError> {
        self.apply(|s, out| {
            let (clay_cost, water_cost) = s.costs();
            let l = &mut s.ledger;
            if l.clay < clay_cost || l.water < water_cost {
                return Err(ActionError::InsufficientMaterials {
                    clay_needed: clay_cost,
                    clay_available: l.clay,
                    water_needed: water_cost,
                    water_available: l.water,
                });
            }
            l.clay = round2(l.clay - clay_cost).max(0.0);
            l.water = round2(l.water - water_cost).max(0.0);
            l.bricks_made_manually += 1;
            let made = manual_output(&s.upgrades, &s.lever);
            record_output(s, out, made);
            Ok(made)
        })
    }

    /// Sell bricks at the live price. Returns the revenue.
    pub fn sell(&mut self, quantity: u64) -> Result<Decimal, ActionError> {
        self.apply(|s, out| {
            let wanted = quantity as f64;
            if s.ledger.bricks < wanted {
                return Err(ActionError::InsufficientGoods {
                    requested: quantity,
                    available: s.ledger.bricks,
                });
            }
            let revenue = sale_revenue(&s.market, &s.event, quantity);
            s.ledger.bricks -= wanted;
            s.ledger.funds += revenue;
            out.push(
                Level::Success,
                format!("Sold {quantity} bricks for {revenue} GNF"),
            );
            Ok(revenue)
        })
    }

    /// Buy `quantity` units of a raw material for `price`.
    pub fn buy_raw(
        &mut self,
        material: RawMaterial,
        quantity: u32,
        price: Decimal,
    ) -> Result<(), ActionError> {
        self.apply(|s, out| {
            pay(s, price)?;
            *s.ledger.raw_mut(material) += f64::from(quantity);
            out.push(
                Level::Success,
                format!("Bought {quantity} {material} for {price} GNF"),
            );
            Ok(())
        })
    }

    pub fn buy_pack(&mut self, pack: &ResourcePack) -> Result<(), ActionError> {
        self.buy_raw(pack.material, pack.quantity, Decimal::from(pack.price))
    }

    /// Buy one unit of an upgrade. Returns the price paid.
    pub fn buy_upgrade(&mut self, kind: UpgradeKind) -> Result<Decimal, ActionError> {
        self.apply(|s, out| {
            let upgrade = s.upgrades.get(kind);
            if !upgrade.unlocked {
                return Err(ActionError::UpgradeLocked {
                    upgrade: kind,
                    threshold: upgrade.unlock_threshold,
                });
            }
            let price = upgrade_price(upgrade);
            pay(s, price)?;
            s.upgrades.get_mut(kind).owned += 1;
            out.push(Level::Success, format!("Bought {kind} for {price} GNF"));
            Ok(price)
        })
    }

    /// Raise a generator by one level. Returns the new level.
    pub fn upgrade_generator(&mut self, kind: GeneratorKind) -> Result<u32, ActionError> {
        self.apply(|s, out| {
            let price = generator_price(s.generators.get(kind));
            pay(s, price)?;
            let g = s.generators.get_mut(kind);
            g.level += 1;
            let level = g.level;
            out.push(
                Level::Success,
                format!("{kind} upgraded to level {level} for {price} GNF"),
            );
            Ok(level)
        })
    }

    /// Move the production lever; out-of-range levels are clamped.
    pub fn set_lever(&mut self, level: i64) -> ProductionLever {
        let lever = ProductionLever::at_level(level);
        self.state.lever = lever.clone();
        self.notify(
            Level::Info,
            format!(
                "Production lever at {}%: efficiency {:.2}, {:.2} clay and {:.2} water per brick",
                lever.level, lever.efficiency, lever.clay_cost, lever.water_cost
            ),
        );
        lever
    }

    /// Claim an offered opportunity and credit its grants.
    pub fn claim_opportunity(&mut self, id: u32) -> Result<&'static Opportunity, ActionError> {
        self.apply(|s, out| {
            let pos = s
                .offered
                .iter()
                .position(|o| *o == id)
                .ok_or(ActionError::UnknownOpportunity(id))?;
            let opp = catalog::opportunity(id).ok_or(ActionError::UnknownOpportunity(id))?;
            for grant in opp.grants {
                s.ledger.apply_grant(grant);
            }
            s.offered.remove(pos);
            s.projects_claimed += 1;
            out.push(Level::Success, format!("Project completed: {}", opp.name));
            out.push(Level::Info, opp.description);
            Ok(opp)
        })
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        let mut next = self.state.clone();
        let mut out = Outbox::default();
        let tick = next.clock.advance();

        produce_automatically(&mut next, &mut out);
        accrue_generators(&mut next);
        decay_event(&mut next, &mut out);
        spawn_opportunity(&mut next, &self.config, &mut self.rng, &mut out);
        if next.clock.market.fire(tick) {
            move_market(&mut next, &self.config, &mut self.rng, &mut out);
        }
        if next.clock.events.fire(tick) {
            trigger_event(&mut next, &self.config, &mut self.rng, &mut out);
        }
        let save_due = next.clock.save.fire(tick);

        self.state = next;
        self.publish(out);
        if save_due {
            // Failures are already reported as a notification.
            let _ = self.save();
        }
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Write the current state to the store.
    pub fn save(&mut self) -> Result<(), PersistError> {
        let mut snap = self.state.snapshot();
        snap.saved_at = Some(Utc::now());
        match self.store.save(&snap) {
            Ok(()) => {
                debug!(tick = snap.tick, "game saved");
                self.notify(Level::Info, "Game saved");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, tick = snap.tick, "save failed");
                self.notify(Level::Error, "Save failed");
                Err(err)
            }
        }
    }

    /// Clear the store and start over from the starting state.
    pub fn reset(&mut self) -> Result<(), PersistError> {
        if let Err(err) = self.store.reset() {
            warn!(error = %err, "reset failed");
            self.notify(Level::Error, "Reset failed");
            return Err(err);
        }
        self.state = SimState::from_snapshot(Snapshot::default(), &self.config);
        info!("session reset");
        self.notify(Level::Info, "Game reset");
        Ok(())
    }

    /// Save one last time and hand the store back.
    pub fn end(mut self) -> Result<S, PersistError> {
        self.save()?;
        info!(tick = self.tick(), "session ended");
        Ok(self.store)
    }
}

fn pay(s: &mut SimState, price: Decimal) -> Result<(), ActionError> {
    if s.ledger.funds < price {
        return Err(ActionError::InsufficientFunds {
            price,
            available: s.ledger.funds,
        });
    }
    s.ledger.funds -= price;
    Ok(())
}

/// Credit freshly made bricks and unlock whatever the new total reaches.
fn record_output(s: &mut SimState, out: &mut Outbox, made: f64) {
    s.ledger.bricks += made;
    s.ledger.bricks_made_total += made;
    s.ledger.progress += 1;
    for kind in scan_unlocks(&mut s.upgrades, s.ledger.bricks_made_total) {
        out.push(Level::Success, format!("New upgrade available: {kind}"));
    }
}

fn produce_automatically(s: &mut SimState, out: &mut Outbox) {
    let rate = auto_rate(&s.upgrades, &s.lever);
    if rate <= 0.0 {
        return;
    }
    let (clay_cost, water_cost) = s.costs();
    let batch = auto_batch(&s.ledger, (clay_cost, water_cost), rate);
    if batch <= 0.0 {
        if s.ledger.clay > 0.0 && s.ledger.water > 0.0 {
            out.push(
                Level::Error,
                "Production halted: not enough clay or water for automatic production",
            );
        }
        return;
    }
    let l = &mut s.ledger;
    l.clay = round2(l.clay - batch * clay_cost).max(0.0);
    l.water = round2(l.water - batch * water_cost).max(0.0);
    record_output(s, out, batch);
}

fn accrue_generators(s: &mut SimState) {
    if let Some((clay, water)) = accrue(&s.generators) {
        s.ledger.clay = round2(s.ledger.clay + clay);
        s.ledger.water = round2(s.ledger.water + water);
    }
}

fn decay_event(s: &mut SimState, out: &mut Outbox) {
    if sim_econ::decay_event(&mut s.event) {
        out.push(Level::Info, format!("{} is over", s.event.name));
    }
}

fn spawn_opportunity(
    s: &mut SimState,
    cfg: &SimConfig,
    rng: &mut dyn RandomSource,
    out: &mut Outbox,
) {
    if s.clock.opportunity_cooling_down() {
        return;
    }
    let drawn = roll_opportunity(
        &s.offered,
        cfg.max_offered_opportunities,
        cfg.opportunity_chance,
        rng,
    );
    if let Some(opp) = drawn {
        s.offered.push(opp.id);
        s.clock.start_opportunity_cooldown(cfg.opportunity_cooldown);
        out.push(Level::Info, format!("New opportunity: {}", opp.name));
    }
}

fn move_market(s: &mut SimState, cfg: &SimConfig, rng: &mut dyn RandomSource, out: &mut Outbox) {
    let update = update_market(&mut s.market, &s.event, cfg.trend_change_chance, rng);
    if update.trend_changed && s.upgrades.has_effect(UpgradeEffect::MarketInsight) {
        out.push(
            Level::Info,
            format!("Market trend is now {}", s.market.trend),
        );
    }
}

fn trigger_event(
    s: &mut SimState,
    cfg: &SimConfig,
    rng: &mut dyn RandomSource,
    out: &mut Outbox,
) {
    let insight = s.upgrades.has_effect(UpgradeEffect::MarketInsight);
    if let Some(template) = roll_event(&s.event, insight, cfg.event_chance, rng) {
        s.event = EconomicEvent::start(template);
        info!(event = template.name, "economic event started");
        out.push(
            Level::Warning,
            format!("{} - {}", template.name, template.description),
        );
    }
}
