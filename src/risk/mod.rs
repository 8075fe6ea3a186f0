//! Risk-weighted assets, leverage, liquidity (HQLA/LCR/NSFR) and regulatory
//! compliance evaluation (§4.4).

mod metrics;

pub use metrics::{compute_risk_metrics, evaluate_compliance, Compliance, RiskMetrics};
