//! Serialized session state exchanged with the persistence layer.

use crate::{
    round2, EconomicEvent, Generators, Ledger, MarketState, ProductionLever, UpgradeKind, Upgrades,
    DEMAND_MAX, DEMAND_MIN, DEMAND_NEUTRAL,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Current snapshot layout version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Full persisted state: ledger, lever, market, generators, upgrades, event.
///
/// Every substructure defaults independently, so a snapshot missing a section
/// still loads; [`Snapshot::repair`] then restores derived invariants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    /// Simulation tick at which the snapshot was taken.
    pub tick: u64,
    pub ledger: Ledger,
    pub lever: ProductionLever,
    pub market: MarketState,
    pub generators: Generators,
    pub upgrades: Upgrades,
    pub event: EconomicEvent,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            saved_at: None,
            tick: 0,
            ledger: Ledger::default(),
            lever: ProductionLever::default(),
            market: MarketState::default(),
            generators: Generators::default(),
            upgrades: Upgrades::default(),
            event: EconomicEvent::default(),
        }
    }
}

impl Snapshot {
    /// Parse a snapshot and repair whatever is malformed.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut snap: Snapshot = serde_json::from_str(text)?;
        snap.repair();
        Ok(snap)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Re-derive invariants a hand-edited or older snapshot may violate.
    ///
    /// Returns the number of fields that had to be fixed.
    pub fn repair(&mut self) -> usize {
        let mut fixed = 0;

        let l = &mut self.ledger;
        for v in [&mut l.bricks, &mut l.clay, &mut l.water, &mut l.bricks_made_total] {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
                fixed += 1;
            }
        }
        if l.funds < Decimal::ZERO {
            l.funds = Decimal::ZERO;
            fixed += 1;
        }

        let lever = ProductionLever::at_level(i64::from(self.lever.level));
        if lever != self.lever {
            self.lever = lever;
            fixed += 1;
        }

        // The multiplier is only re-derived when demand itself was off; a fresh
        // market legitimately starts at 1.0 until its first update.
        let m = &mut self.market;
        let demand = if m.demand_level.is_finite() {
            m.demand_level.clamp(DEMAND_MIN, DEMAND_MAX)
        } else {
            DEMAND_NEUTRAL
        };
        if demand != m.demand_level || !m.price_multiplier.is_finite() {
            m.demand_level = demand;
            m.price_multiplier = round2(0.7 + demand / 100.0 * 0.6);
            fixed += 1;
        }

        if self.event.active && (self.event.remaining == 0 || self.event.duration == 0) {
            self.event = EconomicEvent::default();
            fixed += 1;
        } else if self.event.remaining > self.event.duration {
            self.event.remaining = self.event.duration;
            fixed += 1;
        }

        for kind in UpgradeKind::ALL {
            let total = self.ledger.bricks_made_total;
            let u = self.upgrades.get_mut(kind);
            if !u.unlocked && total >= u.unlock_threshold {
                u.unlocked = true;
                fixed += 1;
            }
        }

        if fixed > 0 {
            warn!(fixed, "repaired loaded snapshot");
        }
        self.version = SNAPSHOT_FORMAT_VERSION;
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_snapshot;

    #[test]
    fn snapshot_roundtrip() {
        let mut snap = Snapshot::default();
        snap.ledger.bricks = 12.5;
        snap.upgrades.molds.owned = 2;
        snap.tick = 90;
        let text = snap.to_json().unwrap();
        let back = Snapshot::from_json(&text).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let text = r#"{ "ledger": { "bricks": 3.0, "funds": "2500" } }"#;
        let snap = Snapshot::from_json(text).unwrap();
        assert_eq!(snap.ledger.bricks, 3.0);
        assert_eq!(snap.ledger.clay, 100.0);
        assert_eq!(snap.ledger.funds, Decimal::new(2500, 0));
        assert_eq!(snap.lever, ProductionLever::default());
        assert_eq!(snap.market, MarketState::default());
        assert_eq!(snap.generators, Generators::default());
        assert!(!snap.event.active);
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn repair_rederives_lever_market_and_unlocks() {
        let text = r#"{
            "ledger": { "bricks_made_total": 320.0, "water": -4.0 },
            "lever": { "level": 400, "clay_cost": 123.0 },
            "market": { "demand_level": 150.0, "trend": 1 }
        }"#;
        let snap = Snapshot::from_json(text).unwrap();
        assert_eq!(snap.ledger.water, 0.0);
        assert_eq!(snap.lever.level, 150);
        assert_eq!(snap.lever.clay_cost, 1.5);
        assert_eq!(snap.market.demand_level, 130.0);
        assert_eq!(snap.market.price_multiplier, 1.48);
        assert!(snap.upgrades.molds.unlocked);
        assert!(snap.upgrades.resource_management.unlocked);
        assert!(!snap.upgrades.small_factory.unlocked);
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn partial_generators_keep_their_own_defaults() {
        let text = r#"{ "generators": { "irrigation": {
            "level": 2, "per_level_yield": 0.3, "base_price": "250000",
            "price_growth": 1.3, "progression": 1.2 } } }"#;
        let snap = Snapshot::from_json(text).unwrap();
        assert_eq!(snap.generators.irrigation.level, 2);
        assert_eq!(snap.generators.excavator.level, 0);
        assert_eq!(snap.generators.recycling.progression, 1.15);
    }

    #[test]
    fn partial_entries_fill_missing_fields_from_the_catalog() {
        let snap = Snapshot::from_json(r#"{ "upgrades": { "molds": { "owned": 2 } } }"#).unwrap();
        assert_eq!(snap.upgrades.molds.owned, 2);
        assert_eq!(snap.upgrades.molds.base_price, Decimal::new(15_000, 0));
        assert_eq!(snap.upgrades.molds.unlock_threshold, 5.0);
        assert_eq!(snap.upgrades.workers, Upgrades::default().workers);

        let snap =
            Snapshot::from_json(r#"{ "generators": { "excavator": { "level": 3 } } }"#).unwrap();
        assert_eq!(snap.generators.excavator.level, 3);
        assert_eq!(snap.generators.excavator.per_level_yield, 0.2);
        assert_eq!(snap.generators.excavator.base_price, Decimal::new(300_000, 0));
        assert_eq!(snap.generators.excavator.progression, 1.2);
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn null_fields_take_catalog_values() {
        let text = r#"{ "upgrades": { "workers": { "owned": 1, "base_price": null } } }"#;
        let snap = Snapshot::from_json(text).unwrap();
        assert_eq!(snap.upgrades.workers.owned, 1);
        assert_eq!(snap.upgrades.workers.base_price, Decimal::new(100_000, 0));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Snapshot::from_json("{ not json").is_err());
    }
}
