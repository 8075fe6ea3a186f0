//! The configuration record: global parameters, per-product parameters,
//! liquidity tags, risk limits, behavioural parameters, shock parameters and
//! tolerances. No I/O; the only way to build a non-default `Config` is to
//! start from [`Config::default`] and merge a [`ScenarioOverrides`] onto it.

use serde::{Deserialize, Serialize};

use crate::balance_sheet::{BalanceSheetItem, HqlaLevel};
use crate::market::MarketState;
use crate::product::ProductType;
use crate::state::{BehaviouralState, CapitalState, CashFlowStatement, IncomeStatement, Status};

/// Parameters that apply across the whole bank.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub tax_rate: f64,
    pub operating_cost_ratio: f64,
    pub max_deposit_growth_per_step: f64,
    pub max_loan_growth_per_step: f64,
    pub fixed_operating_cost_per_month: f64,
    pub initial_portfolio_seed: i32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.25,
            operating_cost_ratio: 0.015,
            max_deposit_growth_per_step: 0.05,
            max_loan_growth_per_step: 0.05,
            fixed_operating_cost_per_month: 5e6,
            initial_portfolio_seed: 42,
        }
    }
}

/// Loan-specific parameters, present only for loan products.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoanParameters {
    pub default_term_months: u32,
    pub max_term_months: u32,
    pub initial_seasoning_enabled: bool,
    pub initial_coupon_dispersion_bps: f64,
    pub initial_pd_multiplier_range: (f64, f64),
    pub initial_lgd_multiplier_range: (f64, f64),
    pub initial_min_bucket_outstanding: f64,
}

impl Default for LoanParameters {
    fn default() -> Self {
        Self {
            default_term_months: 360,
            max_term_months: 420,
            initial_seasoning_enabled: true,
            initial_coupon_dispersion_bps: 25.0,
            initial_pd_multiplier_range: (0.7, 1.3),
            initial_lgd_multiplier_range: (0.8, 1.2),
            initial_min_bucket_outstanding: 1e6,
        }
    }
}

/// Per-product static and behavioural parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProductParameters {
    pub risk_weight: f64,
    pub base_default_rate: f64,
    pub loss_given_default: f64,
    pub volume_elasticity_to_rate: f64,
    pub loan: Option<LoanParameters>,
}

impl ProductParameters {
    fn asset(risk_weight: f64) -> Self {
        Self {
            risk_weight,
            base_default_rate: 0.0,
            loss_given_default: 0.0,
            volume_elasticity_to_rate: 0.0,
            loan: None,
        }
    }

    fn deposit(elasticity: f64) -> Self {
        Self {
            risk_weight: 0.0,
            base_default_rate: 0.0,
            loss_given_default: 0.0,
            volume_elasticity_to_rate: elasticity,
            loan: None,
        }
    }

    fn loan_product(risk_weight: f64, pd: f64, lgd: f64, elasticity: f64) -> Self {
        Self {
            risk_weight,
            base_default_rate: pd,
            loss_given_default: lgd,
            volume_elasticity_to_rate: elasticity,
            loan: Some(LoanParameters::default()),
        }
    }
}

/// Regulatory ratio floors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskLimits {
    pub min_cet1_ratio: f64,
    pub min_leverage_ratio: f64,
    pub min_lcr: f64,
    pub min_nsfr: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            min_cet1_ratio: 0.045,
            min_leverage_ratio: 0.03,
            min_lcr: 1.0,
            min_nsfr: 1.0,
        }
    }
}

/// Behavioural-flow parameters shared by the deposit and loan models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BehaviourConfig {
    pub deposit_baseline_growth_monthly: f64,
    pub loan_baseline_growth_monthly: f64,
    pub min_deposit_growth_per_step: f64,
    pub min_loan_growth_per_step: f64,
    pub loan_fee_rate_monthly: f64,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            deposit_baseline_growth_monthly: 0.002,
            loan_baseline_growth_monthly: 0.003,
            min_deposit_growth_per_step: -0.05,
            min_loan_growth_per_step: -0.05,
            loan_fee_rate_monthly: 0.0005,
        }
    }
}

/// Parameters for the `idiosyncraticRun` shock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdiosyncraticRunParameters {
    pub base_run_off_rate: f64,
    pub incremental_rate: f64,
    pub max_run_off_rate: f64,
}

impl Default for IdiosyncraticRunParameters {
    fn default() -> Self {
        Self {
            base_run_off_rate: 0.02,
            incremental_rate: 0.05,
            max_run_off_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShockParameters {
    pub idiosyncratic_run: IdiosyncraticRunParameters,
}

impl Default for ShockParameters {
    fn default() -> Self {
        Self {
            idiosyncratic_run: IdiosyncraticRunParameters::default(),
        }
    }
}

/// Numeric tolerances used by the cash-flow statement tie-out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tolerances {
    pub cash_flow_rounding_tolerance: f64,
    pub cash_flow_breach_threshold: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            cash_flow_rounding_tolerance: 1e-2,
            cash_flow_breach_threshold: 1.0,
        }
    }
}

/// Liquidity classification for a product, the config-side counterpart of
/// [`crate::balance_sheet::LiquidityTag`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LiquidityTagConfig {
    pub hqla_level: HqlaLevel,
    pub lcr_outflow_rate: Option<f64>,
    pub lcr_inflow_rate: Option<f64>,
    pub nsfr_asf_factor: Option<f64>,
    pub nsfr_rsf_factor: Option<f64>,
}

impl LiquidityTagConfig {
    fn new(hqla_level: HqlaLevel) -> Self {
        Self {
            hqla_level,
            lcr_outflow_rate: None,
            lcr_inflow_rate: None,
            nsfr_asf_factor: None,
            nsfr_rsf_factor: None,
        }
    }

    pub fn to_tag(self) -> crate::balance_sheet::LiquidityTag {
        crate::balance_sheet::LiquidityTag {
            hqla_level: self.hqla_level,
            lcr_outflow_rate: self.lcr_outflow_rate,
            lcr_inflow_rate: self.lcr_inflow_rate,
            nsfr_asf_factor: self.nsfr_asf_factor,
            nsfr_rsf_factor: self.nsfr_rsf_factor,
        }
    }
}

/// The full configuration record (§6 EXTERNAL INTERFACES).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub global: GlobalConfig,
    pub product_parameters: Vec<(ProductType, ProductParameters)>,
    pub liquidity_tags: Vec<(ProductType, LiquidityTagConfig)>,
    pub risk_limits: RiskLimits,
    pub behaviour: BehaviourConfig,
    pub shock_parameters: ShockParameters,
    pub tolerances: Tolerances,
}

impl Config {
    pub fn product_parameters(&self, product: ProductType) -> ProductParameters {
        self.product_parameters
            .iter()
            .find(|(p, _)| *p == product)
            .map(|(_, params)| *params)
            .unwrap_or(ProductParameters::asset(0.0))
    }

    pub fn liquidity_tag(&self, product: ProductType) -> crate::balance_sheet::LiquidityTag {
        self.liquidity_tags
            .iter()
            .find(|(p, _)| *p == product)
            .map(|(_, tag)| tag.to_tag())
            .unwrap_or_default()
    }

    /// Default term for a loan product, or `None` if unconfigured.
    pub fn default_term_months(&self, product: ProductType) -> Option<u32> {
        self.product_parameters(product).loan.map(|l| l.default_term_months)
    }

    pub fn max_term_months(&self, product: ProductType) -> u32 {
        self.product_parameters(product)
            .loan
            .map(|l| l.max_term_months.min(420))
            .unwrap_or(420)
    }
}

impl Default for Config {
    fn default() -> Self {
        use HqlaLevel::*;
        use ProductType::*;

        let product_parameters = vec![
            (CashReserves, ProductParameters::asset(0.0)),
            (Gilts, ProductParameters::asset(0.0)),
            (Mortgages, ProductParameters::loan_product(0.35, 0.006, 0.25, 0.4)),
            (CorporateLoans, ProductParameters::loan_product(0.75, 0.02, 0.45, 0.3)),
            (ReverseRepo, ProductParameters::asset(0.2)),
            (RetailDeposits, ProductParameters::deposit(0.6)),
            (CorporateDeposits, ProductParameters::deposit(0.4)),
            (WholesaleFundingST, ProductParameters::asset(0.0)),
            (WholesaleFundingLT, ProductParameters::asset(0.0)),
            (RepurchaseAgreements, ProductParameters::asset(0.0)),
        ];

        let mut tag = |level| LiquidityTagConfig::new(level);
        let liquidity_tags = vec![
            (CashReserves, {
                let mut t = tag(Level1);
                t.nsfr_asf_factor = Some(0.0);
                t.nsfr_rsf_factor = Some(0.0);
                t
            }),
            (Gilts, {
                let mut t = tag(Level1);
                t.nsfr_rsf_factor = Some(0.05);
                t
            }),
            (Mortgages, {
                let mut t = tag(None);
                t.nsfr_rsf_factor = Some(0.65);
                t
            }),
            (CorporateLoans, {
                let mut t = tag(None);
                t.nsfr_rsf_factor = Some(0.85);
                t
            }),
            (ReverseRepo, {
                let mut t = tag(None);
                t.nsfr_rsf_factor = Some(0.1);
                t
            }),
            (RetailDeposits, {
                let mut t = tag(None);
                t.lcr_outflow_rate = Some(0.05);
                t.nsfr_asf_factor = Some(0.9);
                t
            }),
            (CorporateDeposits, {
                let mut t = tag(None);
                t.lcr_outflow_rate = Some(0.25);
                t.nsfr_asf_factor = Some(0.5);
                t
            }),
            (WholesaleFundingST, {
                let mut t = tag(None);
                t.lcr_outflow_rate = Some(1.0);
                t.nsfr_asf_factor = Some(0.0);
                t
            }),
            (WholesaleFundingLT, {
                let mut t = tag(None);
                t.nsfr_asf_factor = Some(1.0);
                t
            }),
            (RepurchaseAgreements, {
                let mut t = tag(None);
                t.lcr_outflow_rate = Some(1.0);
                t.nsfr_asf_factor = Some(0.0);
                t
            }),
        ];

        Self {
            global: GlobalConfig::default(),
            product_parameters,
            liquidity_tags,
            risk_limits: RiskLimits::default(),
            behaviour: BehaviourConfig::default(),
            shock_parameters: ShockParameters::default(),
            tolerances: Tolerances::default(),
        }
    }
}

/// Partial overrides folded onto [`Config::default`] and the opening
/// [`crate::state::BankState`] by [`crate::portfolio::apply_scenario`].
/// Every field is optional; absent fields leave the corresponding base
/// value untouched. The `config.rs`-shaped fields merge onto the config
/// record-by-record; the state-shaped fields merge onto the state the same
/// way (balance-sheet items matched by product, the rest field-by-field).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioOverrides {
    pub global: Option<GlobalConfig>,
    pub product_parameters: Vec<(ProductType, ProductParameters)>,
    pub liquidity_tags: Vec<(ProductType, LiquidityTagConfig)>,
    pub risk_limits: Option<RiskLimits>,
    pub behaviour: Option<BehaviourConfig>,
    pub shock_parameters: Option<ShockParameters>,
    pub tolerances: Option<Tolerances>,
    /// Balance-sheet items to set on the opening state, matched by product.
    pub balance_sheet_items: Vec<(ProductType, BalanceSheetItem)>,
    pub capital: Option<CapitalState>,
    pub income_statement: Option<IncomeStatement>,
    pub cash_flow_statement: Option<CashFlowStatement>,
    pub market: Option<MarketState>,
    pub behaviour_state: Option<BehaviouralState>,
    pub status: Option<Status>,
}

impl Config {
    /// Shallow-merge `overrides` onto `self`, field by field within each
    /// nested record; per-product overrides replace only the named
    /// product's entry, leaving the rest of the table untouched.
    pub fn merged_with(&self, overrides: &ScenarioOverrides) -> Config {
        let mut out = self.clone();
        if let Some(g) = overrides.global {
            out.global = g;
        }
        for (product, params) in &overrides.product_parameters {
            if let Some(slot) = out
                .product_parameters
                .iter_mut()
                .find(|(p, _)| p == product)
            {
                slot.1 = *params;
            } else {
                out.product_parameters.push((*product, *params));
            }
        }
        for (product, tag) in &overrides.liquidity_tags {
            if let Some(slot) = out.liquidity_tags.iter_mut().find(|(p, _)| p == product) {
                slot.1 = *tag;
            } else {
                out.liquidity_tags.push((*product, *tag));
            }
        }
        if let Some(r) = overrides.risk_limits {
            out.risk_limits = r;
        }
        if let Some(b) = overrides.behaviour {
            out.behaviour = b;
        }
        if let Some(s) = overrides.shock_parameters {
            out.shock_parameters = s;
        }
        if let Some(t) = overrides.tolerances {
            out.tolerances = t;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_all_ten_products_parameterised() {
        let cfg = Config::default();
        for p in ProductType::ALL {
            let _ = cfg.product_parameters(p);
        }
        assert_eq!(cfg.product_parameters.len(), 10);
        assert_eq!(cfg.liquidity_tags.len(), 10);
    }

    #[test]
    fn merge_overrides_only_named_fields() {
        let base = Config::default();
        let mut overrides = ScenarioOverrides::default();
        overrides.risk_limits = Some(RiskLimits {
            min_cet1_ratio: 0.08,
            ..RiskLimits::default()
        });
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.risk_limits.min_cet1_ratio, 0.08);
        assert_eq!(merged.global.tax_rate, base.global.tax_rate);
    }

    #[test]
    fn merge_product_parameters_replaces_single_entry() {
        let base = Config::default();
        let mut overrides = ScenarioOverrides::default();
        overrides
            .product_parameters
            .push((ProductType::Mortgages, ProductParameters::loan_product(0.5, 0.01, 0.3, 0.2)));
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.product_parameters(ProductType::Mortgages).risk_weight, 0.5);
        assert_eq!(
            merged.product_parameters(ProductType::CorporateLoans).risk_weight,
            base.product_parameters(ProductType::CorporateLoans).risk_weight
        );
    }
}
