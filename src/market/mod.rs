//! The exogenous macro-market model: correlated factor process, regime
//! switching, policy rate, yield curve, spreads and competitor rates
//! (§4.3).

mod cholesky;
mod curve;
mod model;
mod types;

pub use curve::{eval as eval_nelson_siegel, fit_nelson_siegel};
pub use model::advance_market;
pub use types::{
    CompetitorRates, GdpRegime, GiltCurve, MacroModelState, MacroObservables, MarketState,
    NelsonSiegelFactors, RepoHaircuts, Spreads,
};
