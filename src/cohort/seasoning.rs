//! Generation of a seasoned starting portfolio for a loan product (§4.2
//! `generate_seasoned`).

use crate::cohort::types::LoanCohort;
use crate::config::{Config, LoanParameters};
use crate::error::EngineError;
use crate::product::ProductType;
use crate::rng::SeededRng;

/// Fraction of original principal still outstanding after `k` of `n`
/// monthly payments on a standard annuity loan at annual rate `r_annual`.
pub fn outstanding_factor(r_annual: f64, n: u32, k: u32) -> f64 {
    if k >= n {
        return 0.0;
    }
    let r = r_annual / 12.0;
    if r.abs() < 1e-9 {
        return (n - k) as f64 / n as f64;
    }
    let g = 1.0 + r;
    let num = g.powi(n as i32) - g.powi(k as i32);
    let den = g.powi(n as i32) - 1.0;
    (num / den).clamp(0.0, 1.0)
}

fn smooth_once(weights: &[f64]) -> Vec<f64> {
    let len = weights.len();
    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(len.saturating_sub(1));
            let window = &weights[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Build a seasoned set of cohorts whose outstanding sums to `target_outstanding`.
pub fn generate_seasoned(
    product: ProductType,
    target_outstanding: f64,
    base_rate: f64,
    base_pd: f64,
    base_lgd: f64,
    config: &Config,
    seed: i32,
) -> Result<Vec<LoanCohort>, EngineError> {
    let loan_params: LoanParameters = config
        .product_parameters(product)
        .loan
        .unwrap_or_default();

    let default_term = config
        .default_term_months(product)
        .ok_or(EngineError::MissingDefaultTerm(product))?;

    if !loan_params.initial_seasoning_enabled || target_outstanding <= 0.0 {
        let outstanding = target_outstanding.max(0.0);
        return Ok(vec![LoanCohort {
            product,
            cohort_id: 0,
            original_principal: outstanding,
            outstanding_principal: outstanding,
            annual_interest_rate: base_rate,
            term_months: default_term,
            age_months: 0,
            annual_pd: base_pd,
            lgd: base_lgd,
        }]);
    }

    let mut rng = SeededRng::new(seed);
    let n = default_term;

    let mut weights: Vec<f64> = (0..n)
        .map(|k| outstanding_factor(base_rate, n, k) * (rng.normal() * 0.12).exp())
        .collect();

    weights = smooth_once(&weights);
    weights = smooth_once(&weights);

    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for w in &mut weights {
            *w /= total;
        }
    }

    let mut bucket_outstanding: Vec<(u32, f64)> = weights
        .iter()
        .enumerate()
        .map(|(k, w)| (k as u32, w * target_outstanding))
        .filter(|(_, outstanding)| *outstanding >= loan_params.initial_min_bucket_outstanding)
        .collect();

    let survivors_total: f64 = bucket_outstanding.iter().map(|(_, o)| o).sum();
    if survivors_total > 0.0 {
        let scale = target_outstanding / survivors_total;
        for (_, outstanding) in &mut bucket_outstanding {
            *outstanding *= scale;
        }
    }

    let dispersion_sigma = loan_params.initial_coupon_dispersion_bps / 1e4;
    let (pd_lo, pd_hi) = loan_params.initial_pd_multiplier_range;
    let (lgd_lo, lgd_hi) = loan_params.initial_lgd_multiplier_range;

    let mut cohorts: Vec<LoanCohort> = bucket_outstanding
        .into_iter()
        .map(|(age, outstanding)| {
            let coupon = (base_rate + rng.normal() * dispersion_sigma).clamp(1e-4, 0.25);
            let pd_mult = pd_lo + rng.uniform() * (pd_hi - pd_lo);
            let lgd_mult = lgd_lo + rng.uniform() * (lgd_hi - lgd_lo);

            let factor = outstanding_factor(coupon, n, age);
            let original_principal = if factor > 1e-9 {
                outstanding / factor
            } else {
                outstanding
            };

            LoanCohort {
                product,
                cohort_id: -(age as i64),
                original_principal,
                outstanding_principal: outstanding,
                annual_interest_rate: coupon,
                term_months: n,
                age_months: age,
                annual_pd: (base_pd * pd_mult).clamp(0.0, 0.999999),
                lgd: (base_lgd * lgd_mult).clamp(0.0, 1.0),
            }
        })
        .collect();

    cohorts.sort_by_key(|c| c.cohort_id);

    let actual: f64 = cohorts.iter().map(|c| c.outstanding_principal).sum();
    let tolerance = (1e6_f64).max(target_outstanding * 1e-6);
    if (actual - target_outstanding).abs() > tolerance {
        return Err(EngineError::SeasoningMismatch {
            product,
            actual,
            target: target_outstanding,
            tolerance,
        });
    }

    Ok(cohorts)
}
