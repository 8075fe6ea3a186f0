//! Player actions: pricing, funding, and asset-trade instructions applied in
//! input order during step 4 of the pipeline.

use serde::{Deserialize, Serialize};

use crate::product::ProductType;

/// A single player-issued action for one step. Closed sum type dispatched
/// exhaustively by [`crate::step::pipeline`]; unrecognised shapes can only
/// arise from a future wire revision and must warn rather than abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerAction {
    /// Set a product's annualised interest rate.
    AdjustRate { product: ProductType, rate: f64 },
    /// Raise common equity tier 1 capital, crediting cash one-for-one.
    IssueEquity { amount: f64 },
    /// Issue wholesale debt (short- or long-term), blending the rate into
    /// any existing balance for the product.
    IssueDebt {
        product: ProductType,
        amount: f64,
        rate: Option<f64>,
    },
    /// Buy (positive `delta`) or sell (negative `delta`) a balance-sheet
    /// asset. For loan products this originates or prepays a cohort.
    BuySellAsset { product: ProductType, delta: f64 },
    /// Enter a repo (borrow, pledging `collateral_product`) or a reverse
    /// repo (lend, direction = `Lend`).
    EnterRepo {
        direction: RepoDirection,
        collateral_product: ProductType,
        amount: f64,
        haircut: Option<f64>,
        rate: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepoDirection {
    Borrow,
    Lend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_rate_round_trips_through_json() {
        let action = PlayerAction::AdjustRate {
            product: ProductType::RetailDeposits,
            rate: 0.02,
        };
        let json = serde_json::to_string(&action).unwrap();
        let back: PlayerAction = serde_json::from_str(&json).unwrap();
        match back {
            PlayerAction::AdjustRate { product, rate } => {
                assert_eq!(product, ProductType::RetailDeposits);
                assert_eq!(rate, 0.02);
            }
            _ => panic!("wrong variant"),
        }
    }
}
