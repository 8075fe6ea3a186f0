//! Market-state records (§3 MarketState).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Spreads {
    pub mortgage: f64,
    pub corporate_loan: f64,
    pub wholesale: f64,
    pub senior_debt: f64,
    pub credit: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RepoHaircuts {
    pub gilt: f64,
    pub corp_bond: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CompetitorRates {
    pub retail_deposit: f64,
    pub corporate_deposit: Option<f64>,
    pub mortgage: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MacroObservables {
    pub gdp_growth_mom: f64,
    pub unemployment_rate: f64,
    pub inflation_rate: f64,
    pub credit_spread: f64,
}

/// Nelson-Siegel yield-curve factors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NelsonSiegelFactors {
    pub level: f64,
    pub slope: f64,
    pub curvature: f64,
    pub lambda: f64,
}

impl Default for NelsonSiegelFactors {
    fn default() -> Self {
        Self {
            level: 0.03,
            slope: 0.0,
            curvature: 0.0,
            lambda: 2.5,
        }
    }
}

/// The gilt curve: fitted Nelson-Siegel factors plus explicit evaluated
/// yields at the standard maturities.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GiltCurve {
    pub factors: NelsonSiegelFactors,
    pub y1: f64,
    pub y2: f64,
    pub y3: f64,
    pub y5: f64,
    pub y10: f64,
    pub y20: f64,
    pub y30: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GdpRegime {
    Normal,
    Recession,
}

impl Default for GdpRegime {
    fn default() -> Self {
        GdpRegime::Normal
    }
}

/// Latent substate of the correlated 4-factor macro model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MacroModelState {
    pub d: f64,
    pub s: f64,
    pub f: f64,
    pub r: f64,
    pub regime: GdpRegime,
    pub latent_unemployment: f64,
    pub term_premium: f64,
    pub rng_seed: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketState {
    pub base_rate: f64,
    pub risk_free_short: f64,
    pub risk_free_long: f64,
    pub spreads: Spreads,
    pub repo_haircuts: RepoHaircuts,
    pub competitor_rates: CompetitorRates,
    pub macro_observables: MacroObservables,
    pub gilt_curve: GiltCurve,
    pub macro_model: MacroModelState,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            base_rate: 0.03,
            risk_free_short: 0.03,
            risk_free_long: 0.04,
            spreads: Spreads {
                mortgage: 0.015,
                corporate_loan: 0.02,
                wholesale: 0.01,
                senior_debt: 0.012,
                credit: 0.01,
            },
            repo_haircuts: RepoHaircuts {
                gilt: 0.02,
                corp_bond: 0.06,
            },
            competitor_rates: CompetitorRates {
                retail_deposit: 0.01,
                corporate_deposit: None,
                mortgage: 0.045,
            },
            macro_observables: MacroObservables {
                gdp_growth_mom: 0.0015,
                unemployment_rate: 0.05,
                inflation_rate: 0.02,
                credit_spread: 0.01,
            },
            gilt_curve: GiltCurve {
                factors: NelsonSiegelFactors::default(),
                y1: 0.03,
                y2: 0.031,
                y3: 0.032,
                y5: 0.034,
                y10: 0.037,
                y20: 0.039,
                y30: 0.04,
            },
            macro_model: MacroModelState {
                d: 0.0,
                s: 0.0,
                f: 0.0,
                r: 0.0,
                regime: GdpRegime::Normal,
                latent_unemployment: 0.0,
                term_premium: 0.0185,
                rng_seed: 42,
            },
        }
    }
}
