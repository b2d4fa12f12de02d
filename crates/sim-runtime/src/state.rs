//! The state aggregate and the unified clock.

use rust_decimal::Decimal;
use sim_core::{
    EconomicEvent, FactoryStage, Generators, Ledger, MarketState, ProductionLever, SimConfig,
    Snapshot, Upgrades, SNAPSHOT_FORMAT_VERSION,
};

/// A recurring task due every `period` ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Schedule {
    next: u64,
    period: u64,
}

impl Schedule {
    fn starting_at(tick: u64, period: u64) -> Self {
        let period = period.max(1);
        Self {
            next: tick + period,
            period,
        }
    }

    /// Whether the task is due at `tick`; rearms it when it is.
    pub(crate) fn fire(&mut self, tick: u64) -> bool {
        if tick < self.next {
            return false;
        }
        self.next = tick + self.period;
        true
    }
}

/// One monotonic tick counter plus the due-at counters of periodic work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clock {
    tick: u64,
    pub(crate) market: Schedule,
    pub(crate) events: Schedule,
    pub(crate) save: Schedule,
    opportunity_ready_at: u64,
}

impl Clock {
    pub fn new(start: u64, cfg: &SimConfig) -> Self {
        Self {
            tick: start,
            market: Schedule::starting_at(start, cfg.market_period),
            events: Schedule::starting_at(start, cfg.event_period),
            save: Schedule::starting_at(start, cfg.save_period),
            opportunity_ready_at: start,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Next tick at which the market moves.
    pub fn next_market_update(&self) -> u64 {
        self.market.next
    }

    pub(crate) fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub(crate) fn opportunity_cooling_down(&self) -> bool {
        self.tick < self.opportunity_ready_at
    }

    pub(crate) fn start_opportunity_cooldown(&mut self, ticks: u64) {
        self.opportunity_ready_at = self.tick + ticks;
    }
}

/// Everything a running session mutates.
#[derive(Clone, Debug, PartialEq)]
pub struct SimState {
    pub ledger: Ledger,
    pub lever: ProductionLever,
    pub market: MarketState,
    pub generators: Generators,
    pub upgrades: Upgrades,
    pub event: EconomicEvent,
    /// Ids of opportunities currently on offer.
    pub offered: Vec<u32>,
    pub projects_claimed: u32,
    pub clock: Clock,
}

impl SimState {
    pub fn from_snapshot(snap: Snapshot, cfg: &SimConfig) -> Self {
        Self {
            ledger: snap.ledger,
            lever: snap.lever,
            market: snap.market,
            generators: snap.generators,
            upgrades: snap.upgrades,
            event: snap.event,
            offered: Vec::new(),
            projects_claimed: 0,
            clock: Clock::new(snap.tick, cfg),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            saved_at: None,
            tick: self.clock.tick(),
            ledger: self.ledger.clone(),
            lever: self.lever.clone(),
            market: self.market.clone(),
            generators: self.generators.clone(),
            upgrades: self.upgrades.clone(),
            event: self.event.clone(),
        }
    }

    pub fn stage(&self) -> FactoryStage {
        FactoryStage::of(&self.ledger, &self.upgrades)
    }

    /// Current selling price of one brick.
    pub fn unit_price(&self) -> Decimal {
        sim_econ::unit_price(&self.market, &self.event)
    }

    /// Per-brick clay and water costs, event effect included.
    pub fn costs(&self) -> (f64, f64) {
        sim_econ::effective_costs(&self.lever, &self.event)
    }
}
