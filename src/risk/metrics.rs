//! Risk and liquidity metric computation (§4.4).

use serde::{Deserialize, Serialize};

use crate::balance_sheet::BalanceSheet;
use crate::config::{Config, RiskLimits};
use crate::product::{ProductType, Side};

/// Safe ratio: the spec requires +Infinity (never NaN or -Infinity) when the
/// denominator is zero, regardless of the numerator's sign.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::INFINITY
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub rwa: f64,
    pub leverage_exposure: f64,
    pub cet1_ratio: f64,
    pub leverage_ratio: f64,
    pub hqla: f64,
    pub lcr: f64,
    pub lcr_outflow_multiplier: f64,
    pub asf: f64,
    pub rsf: f64,
    pub nsfr: f64,
}

/// Compute every risk/liquidity metric for the current balance sheet and
/// capital position.
pub fn compute_risk_metrics(
    sheet: &BalanceSheet,
    config: &Config,
    cet1: f64,
    at1: f64,
    lcr_outflow_multiplier: f64,
) -> RiskMetrics {
    let mut rwa = 0.0;
    let mut leverage_exposure = 0.0;
    let mut hqla = 0.0;
    let mut outflows = 0.0;
    let mut inflows = 0.0;
    let mut asf = cet1 + at1;
    let mut rsf = 0.0;

    for (product, item) in sheet.iter() {
        let tag = config.liquidity_tag(product);
        let unencumbered = item.unencumbered();

        if product.side() == Side::Asset {
            leverage_exposure += item.balance;
            rwa += item.balance * config.product_parameters(product).risk_weight;
            hqla += unencumbered * tag.hqla_level.factor();
            if let Some(rate) = tag.lcr_inflow_rate {
                inflows += item.balance * rate;
            }
            if let Some(factor) = tag.nsfr_rsf_factor {
                rsf += item.balance * factor;
            }
        } else {
            if let Some(rate) = tag.lcr_outflow_rate {
                let stress_mult = if product.is_customer_deposit() {
                    lcr_outflow_multiplier
                } else {
                    1.0
                };
                outflows += item.balance * rate * stress_mult;
            }
            if let Some(factor) = tag.nsfr_asf_factor {
                asf += item.balance * factor;
            }
        }
    }

    let inflows_capped = inflows.min(0.75 * outflows);
    let net_outflows = (outflows - inflows_capped).max(0.0);

    RiskMetrics {
        rwa,
        leverage_exposure,
        cet1_ratio: ratio(cet1, rwa),
        leverage_ratio: ratio(cet1 + at1, leverage_exposure),
        hqla,
        lcr: ratio(hqla, net_outflows),
        lcr_outflow_multiplier,
        asf,
        rsf,
        nsfr: ratio(asf, rsf),
    }
}

/// Compliance breaches against the configured regulatory floors. Any `true`
/// flips `status.has_failed` in the step pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Compliance {
    pub cet1_breach: bool,
    pub leverage_breach: bool,
    pub lcr_breach: bool,
    pub nsfr_breach: bool,
}

impl Compliance {
    pub fn any_breach(&self) -> bool {
        self.cet1_breach || self.leverage_breach || self.lcr_breach || self.nsfr_breach
    }
}

pub fn evaluate_compliance(metrics: &RiskMetrics, limits: &RiskLimits) -> Compliance {
    Compliance {
        cet1_breach: metrics.cet1_ratio < limits.min_cet1_ratio,
        leverage_breach: metrics.leverage_ratio < limits.min_leverage_ratio,
        lcr_breach: metrics.lcr < limits.min_lcr,
        nsfr_breach: metrics.nsfr < limits.min_nsfr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};

    #[test]
    fn zero_rwa_yields_infinite_cet1_ratio() {
        let sheet = BalanceSheet::new();
        let config = Config::default();
        let metrics = compute_risk_metrics(&sheet, &config, 100.0, 0.0, 1.0);
        assert_eq!(metrics.rwa, 0.0);
        assert_eq!(metrics.cet1_ratio, f64::INFINITY);
        assert!(!metrics.cet1_ratio.is_nan());
    }

    #[test]
    fn lcr_inflow_cap_limits_contribution() {
        let mut sheet = BalanceSheet::new();
        let mut config = Config::default();
        // Outflow-only liability: 1000 * 100% = 1000 outflow.
        let mut outflow_tag = LiquidityTag::default();
        outflow_tag.lcr_outflow_rate = Some(1.0);
        sheet.set(
            ProductType::WholesaleFundingST,
            BalanceSheetItem::new(1000.0, 0.0, outflow_tag),
        );
        // Inflow-heavy asset: 2000 * 100% = 2000 inflow, capped at 750.
        let mut inflow_tag = LiquidityTag::default();
        inflow_tag.lcr_inflow_rate = Some(1.0);
        inflow_tag.hqla_level = crate::balance_sheet::HqlaLevel::None;
        sheet.set(ProductType::ReverseRepo, BalanceSheetItem::new(2000.0, 0.0, inflow_tag));

        config.liquidity_tags.push((
            ProductType::WholesaleFundingST,
            crate::config::LiquidityTagConfig {
                hqla_level: crate::balance_sheet::HqlaLevel::None,
                lcr_outflow_rate: Some(1.0),
                lcr_inflow_rate: None,
                nsfr_asf_factor: None,
                nsfr_rsf_factor: None,
            },
        ));

        let metrics = compute_risk_metrics(&sheet, &config, 0.0, 0.0, 1.0);
        // netOutflows = 1000 - min(2000, 750) = 250
        assert!((metrics.lcr - metrics.hqla / 250.0).abs() < 1e-9 || metrics.hqla == 0.0);
    }

    #[test]
    fn compliance_flags_every_breach_independently() {
        let metrics = RiskMetrics {
            cet1_ratio: 0.01,
            leverage_ratio: 0.01,
            lcr: 0.5,
            nsfr: 0.5,
            ..Default::default()
        };
        let limits = RiskLimits::default();
        let compliance = evaluate_compliance(&metrics, &limits);
        assert!(compliance.cet1_breach);
        assert!(compliance.leverage_breach);
        assert!(compliance.lcr_breach);
        assert!(compliance.nsfr_breach);
        assert!(compliance.any_breach());
    }
}
