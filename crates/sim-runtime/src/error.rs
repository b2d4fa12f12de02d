//! Rejections of player actions.

use rust_decimal::Decimal;
use sim_core::UpgradeKind;
use thiserror::Error;

/// Why an action was refused. A refused action leaves the session untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error(
        "not enough materials: need {clay_needed:.2} clay and {water_needed:.2} water, \
         have {clay_available:.2} clay and {water_available:.2} water"
    )]
    InsufficientMaterials {
        clay_needed: f64,
        clay_available: f64,
        water_needed: f64,
        water_available: f64,
    },
    #[error("not enough funds: {price} GNF needed, {available} GNF available")]
    InsufficientFunds { price: Decimal, available: Decimal },
    #[error("{upgrade} unlocks after {threshold} bricks produced")]
    UpgradeLocked { upgrade: UpgradeKind, threshold: f64 },
    #[error("cannot sell {requested} bricks, only {available:.2} in stock")]
    InsufficientGoods { requested: u64, available: f64 },
    #[error("opportunity {0} is not on offer")]
    UnknownOpportunity(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_needed_and_available() {
        let e = ActionError::InsufficientMaterials {
            clay_needed: 1.0,
            clay_available: 0.5,
            water_needed: 0.5,
            water_available: 3.0,
        };
        assert_eq!(
            e.to_string(),
            "not enough materials: need 1.00 clay and 0.50 water, have 0.50 clay and 3.00 water"
        );
        let e = ActionError::InsufficientFunds {
            price: Decimal::new(15_000, 0),
            available: Decimal::new(200, 0),
        };
        assert_eq!(
            e.to_string(),
            "not enough funds: 15000 GNF needed, 200 GNF available"
        );
        let e = ActionError::UpgradeLocked {
            upgrade: UpgradeKind::SmallFactory,
            threshold: 500.0,
        };
        assert_eq!(e.to_string(), "small factory unlocks after 500 bricks produced");
    }
}
