//! Static catalogs: economic events, opportunities, raw-material packs and the
//! starting configuration of generators and upgrades.

use crate::ResourceKind::{Bricks, Clay, Funds, Water};
use crate::{EventKind, Generator, GeneratorKind, RawMaterial, ResourceKind, Upgrade, UpgradeKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// Template of an economic event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventTemplate {
    pub kind: EventKind,
    pub name: &'static str,
    pub description: &'static str,
    pub price_effect_pct: i32,
    pub demand_effect_pct: i32,
    pub cost_effect_pct: i32,
    /// Duration in ticks.
    pub duration: u32,
}

/// Events that can hit the market: four push prices up, five push them down.
pub static EVENT_CATALOG: [EventTemplate; 9] = [
    EventTemplate {
        kind: EventKind::Economic,
        name: "Real-estate boom",
        description: "A surge in construction sharply raises brick demand and prices.",
        price_effect_pct: 30,
        demand_effect_pct: 40,
        cost_effect_pct: 0,
        duration: 60,
    },
    EventTemplate {
        kind: EventKind::Political,
        name: "Government subsidy",
        description: "An urban development programme lets you sell bricks at a higher price.",
        price_effect_pct: 25,
        demand_effect_pct: 15,
        cost_effect_pct: -10,
        duration: 90,
    },
    EventTemplate {
        kind: EventKind::Environmental,
        name: "Resource shortage",
        description: "A regional clay shortage drives brick prices up.",
        price_effect_pct: 35,
        demand_effect_pct: -10,
        cost_effect_pct: 20,
        duration: 45,
    },
    EventTemplate {
        kind: EventKind::Commercial,
        name: "Exports to neighbouring countries",
        description: "International orders push selling prices up.",
        price_effect_pct: 20,
        demand_effect_pct: 20,
        cost_effect_pct: 0,
        duration: 70,
    },
    EventTemplate {
        kind: EventKind::Economic,
        name: "Economic crisis",
        description: "A recession cuts demand and prices for building materials.",
        price_effect_pct: -25,
        demand_effect_pct: -30,
        cost_effect_pct: -10,
        duration: 80,
    },
    EventTemplate {
        kind: EventKind::Competition,
        name: "New competing factory",
        description: "A factory opening nearby forces you to lower your prices.",
        price_effect_pct: -20,
        demand_effect_pct: -15,
        cost_effect_pct: 0,
        duration: 60,
    },
    EventTemplate {
        kind: EventKind::Environmental,
        name: "Rainy season",
        description: "Heavy rains slow building sites down and reduce demand.",
        price_effect_pct: -15,
        demand_effect_pct: -25,
        cost_effect_pct: 15,
        duration: 50,
    },
    EventTemplate {
        kind: EventKind::Political,
        name: "New regulation",
        description: "A new building-material standard temporarily lowers prices.",
        price_effect_pct: -20,
        demand_effect_pct: -10,
        cost_effect_pct: 20,
        duration: 65,
    },
    EventTemplate {
        kind: EventKind::Social,
        name: "Transport strike",
        description: "A hauliers' strike complicates deliveries and weighs on prices.",
        price_effect_pct: -15,
        demand_effect_pct: -20,
        cost_effect_pct: 10,
        duration: 55,
    },
];

/// A fixed amount of one resource credited when an opportunity is claimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub resource: ResourceKind,
    pub amount: u32,
}

const fn grant(resource: ResourceKind, amount: u32) -> Grant {
    Grant { resource, amount }
}

/// A one-off project the player may claim once.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Opportunity {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub grants: &'static [Grant],
}

pub static OPPORTUNITY_CATALOG: [Opportunity; 15] = [
    Opportunity {
        id: 1,
        name: "Irrigation system",
        description: "Adds 50 units of water to the factory",
        grants: &[grant(Water, 50)],
    },
    Opportunity {
        id: 2,
        name: "Clay quarry",
        description: "Supplies 50 units of clay",
        grants: &[grant(Clay, 50)],
    },
    Opportunity {
        id: 3,
        name: "State subsidy",
        description: "Receive 100 000 GNF",
        grants: &[grant(Funds, 100_000)],
    },
    Opportunity {
        id: 4,
        name: "Express order",
        description: "Immediate production of 20 bricks",
        grants: &[grant(Bricks, 20)],
    },
    Opportunity {
        id: 5,
        name: "Local donation programme",
        description: "Receive 25 units of water and 25 of clay",
        grants: &[grant(Water, 25), grant(Clay, 25)],
    },
    Opportunity {
        id: 6,
        name: "Private investment",
        description: "Receive 200 000 GNF",
        grants: &[grant(Funds, 200_000)],
    },
    Opportunity {
        id: 7,
        name: "Production line",
        description: "Immediate production of 40 bricks",
        grants: &[grant(Bricks, 40)],
    },
    Opportunity {
        id: 8,
        name: "Bulk clay purchase",
        description: "Supplies 75 units of clay",
        grants: &[grant(Clay, 75)],
    },
    Opportunity {
        id: 9,
        name: "Well drilling",
        description: "Supplies 75 units of water",
        grants: &[grant(Water, 75)],
    },
    Opportunity {
        id: 10,
        name: "Optimization programme",
        description: "30 bricks produced and 50 000 GNF",
        grants: &[grant(Bricks, 30), grant(Funds, 50_000)],
    },
    Opportunity {
        id: 11,
        name: "Technical upgrade",
        description: "Receive 150 000 GNF",
        grants: &[grant(Funds, 150_000)],
    },
    Opportunity {
        id: 12,
        name: "Advertising campaign",
        description: "100 000 GNF and 10 bricks produced",
        grants: &[grant(Funds, 100_000), grant(Bricks, 10)],
    },
    Opportunity {
        id: 13,
        name: "Humanitarian aid package",
        description: "30 water, 30 clay and 10 bricks",
        grants: &[grant(Water, 30), grant(Clay, 30), grant(Bricks, 10)],
    },
    Opportunity {
        id: 14,
        name: "Water collection system",
        description: "Supplies 100 units of water",
        grants: &[grant(Water, 100)],
    },
    Opportunity {
        id: 15,
        name: "Development plan",
        description: "25 bricks, 50 000 GNF and 25 clay",
        grants: &[grant(Bricks, 25), grant(Funds, 50_000), grant(Clay, 25)],
    },
];

/// Look up an opportunity template by id.
pub fn opportunity(id: u32) -> Option<&'static Opportunity> {
    OPPORTUNITY_CATALOG.iter().find(|o| o.id == id)
}

/// A fixed-price raw material purchase offered by the shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResourcePack {
    pub material: RawMaterial,
    pub quantity: u32,
    /// Price in GNF.
    pub price: u32,
}

pub static RESOURCE_PACKS: [ResourcePack; 4] = [
    ResourcePack {
        material: RawMaterial::Clay,
        quantity: 10,
        price: 5_000,
    },
    ResourcePack {
        material: RawMaterial::Clay,
        quantity: 50,
        price: 22_500,
    },
    ResourcePack {
        material: RawMaterial::Water,
        quantity: 10,
        price: 2_500,
    },
    ResourcePack {
        material: RawMaterial::Water,
        quantity: 50,
        price: 10_000,
    },
];

/// Starting state of a generator (level 0).
pub fn default_generator(kind: GeneratorKind) -> Generator {
    let (per_level_yield, base_price, price_growth, progression) = match kind {
        GeneratorKind::Excavator => (0.2, 300_000, 1.3, 1.2),
        GeneratorKind::Irrigation => (0.3, 250_000, 1.3, 1.2),
        GeneratorKind::Recycling => (0.05, 600_000, 1.4, 1.15),
    };
    Generator {
        level: 0,
        per_level_yield,
        base_price: Decimal::from(base_price),
        price_growth,
        progression,
    }
}

/// Starting state of an upgrade (none owned, locked).
pub fn default_upgrade(kind: UpgradeKind) -> Upgrade {
    let (base_price, unit_effect, unlock_threshold): (i64, f64, f64) = match kind {
        UpgradeKind::Molds => (15_000, 0.5, 5.0),
        UpgradeKind::Workers => (100_000, 1.0, 50.0),
        UpgradeKind::SmallFactory => (1_000_000, 10.0, 500.0),
        UpgradeKind::LargeFactory => (10_000_000, 100.0, 5_000.0),
        UpgradeKind::MarketStudy => (500_000, 0.0, 200.0),
        UpgradeKind::ProductionOptimization => (2_000_000, 0.0, 1_000.0),
        UpgradeKind::ResourceManagement => (800_000, 0.0, 300.0),
    };
    Upgrade {
        owned: 0,
        base_price: Decimal::from(base_price),
        unit_effect,
        unlock_threshold,
        unlocked: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn event_catalog_has_four_rises_and_five_falls() {
        let ups = EVENT_CATALOG.iter().filter(|e| e.price_effect_pct > 0).count();
        let downs = EVENT_CATALOG.iter().filter(|e| e.price_effect_pct < 0).count();
        assert_eq!((ups, downs), (4, 5));
        assert!(EVENT_CATALOG.iter().all(|e| e.duration >= 10));
    }

    #[test]
    fn opportunity_ids_are_unique() {
        let ids: BTreeSet<u32> = OPPORTUNITY_CATALOG.iter().map(|o| o.id).collect();
        assert_eq!(ids.len(), OPPORTUNITY_CATALOG.len());
        assert!(OPPORTUNITY_CATALOG.iter().all(|o| !o.grants.is_empty()));
        assert_eq!(opportunity(13).map(|o| o.grants.len()), Some(3));
        assert!(opportunity(99).is_none());
    }

    #[test]
    fn defaults_start_locked_at_level_zero() {
        for kind in UpgradeKind::ALL {
            let u = default_upgrade(kind);
            assert_eq!(u.owned, 0);
            assert!(!u.unlocked);
        }
        for kind in GeneratorKind::ALL {
            assert_eq!(default_generator(kind).level, 0);
        }
    }
}
