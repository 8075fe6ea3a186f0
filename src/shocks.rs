//! Exogenous shocks and the mutable context they fold into during step 3 of
//! the pipeline.

use serde::{Deserialize, Serialize};

use crate::product::ProductType;

/// A single exogenous shock for one step. Closed sum type, dispatched
/// exhaustively; folded into a [`ShockContext`] in input order so multiple
/// shocks compose multiplicatively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Shock {
    /// A competitor raises deposit rates.
    DepositCompetition {
        retail_rate_increase: f64,
        corporate_rate_increase: Option<f64>,
    },
    /// Market-wide spread widening plus a gilt repo haircut increase.
    MarketSpreadShock {
        bps: f64,
        corporate_loan_bps: f64,
        haircut_increase_pct: f64,
    },
    /// A depositor run with an outflow multiplier.
    IdiosyncraticRun { multiplier: f64 },
    /// A macro downturn scaling PD/LGD multipliers.
    MacroDownturn { pd_mult: f64, lgd_mult: f64 },
    /// A counterparty default on a specific product.
    CounterpartyDefault {
        product: ProductType,
        loss_amount: f64,
    },
}

/// Mutable accumulator folded across the shock list by exclusive reference;
/// each shock composes its effect into this single context rather than
/// mutating the state directly, mirroring the teacher's "accumulate, then
/// apply" substructure for computed decrements.
#[derive(Debug, Clone)]
pub struct ShockContext {
    pub pd_multiplier: f64,
    pub lgd_multiplier: f64,
    pub lcr_outflow_multiplier: f64,
    pub extra_losses: Vec<(ProductType, f64)>,
}

impl Default for ShockContext {
    fn default() -> Self {
        Self {
            pd_multiplier: 1.0,
            lgd_multiplier: 1.0,
            lcr_outflow_multiplier: 1.0,
            extra_losses: Vec::new(),
        }
    }
}

impl ShockContext {
    pub fn add_extra_loss(&mut self, product: ProductType, amount: f64) {
        if let Some(slot) = self.extra_losses.iter_mut().find(|(p, _)| *p == product) {
            slot.1 += amount;
        } else {
            self.extra_losses.push((product, amount));
        }
    }

    pub fn extra_loss_for(&self, product: ProductType) -> f64 {
        self.extra_losses
            .iter()
            .find(|(p, _)| *p == product)
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipliers_default_to_identity() {
        let ctx = ShockContext::default();
        assert_eq!(ctx.pd_multiplier, 1.0);
        assert_eq!(ctx.lgd_multiplier, 1.0);
        assert_eq!(ctx.lcr_outflow_multiplier, 1.0);
    }

    #[test]
    fn extra_losses_accumulate_per_product() {
        let mut ctx = ShockContext::default();
        ctx.add_extra_loss(ProductType::CorporateLoans, 10.0);
        ctx.add_extra_loss(ProductType::CorporateLoans, 5.0);
        assert_eq!(ctx.extra_loss_for(ProductType::CorporateLoans), 15.0);
        assert_eq!(ctx.extra_loss_for(ProductType::Mortgages), 0.0);
    }
}
