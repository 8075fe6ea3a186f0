//! Nelson-Siegel yield-curve fitting from three maturity anchors, with the
//! singular-system fallback chain described in §4.3 step 7.

use crate::error::EngineError;
use crate::market::types::NelsonSiegelFactors;

fn slope_loading(t: f64, lambda: f64) -> f64 {
    let ratio = t / lambda;
    if ratio.abs() < 1e-9 {
        1.0
    } else {
        (1.0 - (-ratio).exp()) / ratio
    }
}

fn curvature_loading(t: f64, lambda: f64) -> f64 {
    slope_loading(t, lambda) - (-t / lambda).exp()
}

/// Evaluate a fitted Nelson-Siegel curve at maturity `t` (years).
pub fn eval(factors: &NelsonSiegelFactors, t: f64) -> f64 {
    factors.level
        + factors.slope * slope_loading(t, factors.lambda)
        + factors.curvature * curvature_loading(t, factors.lambda)
}

/// Solve a 3x3 linear system with partial pivoting. `rows[i]` is
/// `[a, b, c, rhs]`. Returns `None` if the system is numerically singular.
fn solve3x3(mut rows: [[f64; 4]; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot_row = (col..3)
            .max_by(|&a, &b| rows[a][col].abs().partial_cmp(&rows[b][col].abs()).unwrap())?;
        if rows[pivot_row][col].abs() < 1e-9 {
            return None;
        }
        rows.swap(col, pivot_row);
        for row in (col + 1)..3 {
            let factor = rows[row][col] / rows[col][col];
            for k in col..4 {
                rows[row][k] -= factor * rows[col][k];
            }
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let mut sum = rows[row][3];
        for col in (row + 1)..3 {
            sum -= rows[row][col] * x[col];
        }
        if rows[row][row].abs() < 1e-9 {
            return None;
        }
        x[row] = sum / rows[row][row];
    }
    Some(x)
}

/// Fit Nelson-Siegel factors via the exact 3-point solve. On a singular
/// system, fall back to `previous`'s factors; with neither a solvable
/// system nor a previous curve, fall back to a flat curve at the mean of
/// the anchors' finite yields. Fails only when no anchor yield is finite.
pub fn fit_nelson_siegel(
    anchors: [(f64, f64); 3],
    lambda: f64,
    previous: Option<NelsonSiegelFactors>,
) -> Result<NelsonSiegelFactors, EngineError> {
    let rows: [[f64; 4]; 3] = anchors.map(|(t, y)| {
        let b2 = slope_loading(t, lambda);
        let b3 = b2 - (-t / lambda).exp();
        [1.0, b2, b3, y]
    });

    if let Some(solved) = solve3x3(rows) {
        return Ok(NelsonSiegelFactors {
            level: solved[0],
            slope: solved[1],
            curvature: solved[2],
            lambda,
        });
    }

    log::warn!("Nelson-Siegel 3-point fit is singular, falling back");
    if let Some(prev) = previous {
        return Ok(prev);
    }

    let finite: Vec<f64> = anchors.iter().map(|(_, y)| *y).filter(|y| y.is_finite()).collect();
    if finite.is_empty() {
        return Err(EngineError::YieldCurveFitFailed);
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    Ok(NelsonSiegelFactors {
        level: mean,
        slope: 0.0,
        curvature: 0.0,
        lambda,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_reproduces_anchor_yields() {
        let factors = NelsonSiegelFactors {
            level: 0.03,
            slope: -0.01,
            curvature: 0.005,
            lambda: 2.5,
        };
        let anchors = [
            (1.0, eval(&factors, 1.0)),
            (5.0, eval(&factors, 5.0)),
            (20.0, eval(&factors, 20.0)),
        ];
        let fitted = fit_nelson_siegel(anchors, 2.5, None).unwrap();
        for t in [1.0, 2.0, 5.0, 10.0, 20.0, 30.0] {
            assert!((eval(&fitted, t) - eval(&factors, t)).abs() < 1e-6);
        }
    }

    #[test]
    fn coincident_maturities_fall_back_to_flat_mean() {
        let anchors = [(5.0, 0.03), (5.0, 0.032), (5.0, 0.031)];
        let fitted = fit_nelson_siegel(anchors, 2.5, None).unwrap();
        assert_eq!(fitted.slope, 0.0);
        assert_eq!(fitted.curvature, 0.0);
        let mean = (0.03 + 0.032 + 0.031) / 3.0;
        assert!((fitted.level - mean).abs() < 1e-9);
    }

    #[test]
    fn coincident_maturities_prefer_previous_curve_when_available() {
        let anchors = [(5.0, 0.03), (5.0, 0.032), (5.0, 0.031)];
        let previous = NelsonSiegelFactors {
            level: 0.025,
            slope: 0.001,
            curvature: -0.002,
            lambda: 2.5,
        };
        let fitted = fit_nelson_siegel(anchors, 2.5, Some(previous)).unwrap();
        assert_eq!(fitted.level, previous.level);
        assert_eq!(fitted.slope, previous.slope);
    }

    #[test]
    fn all_non_finite_anchors_is_fatal() {
        let anchors = [(5.0, f64::NAN), (5.0, f64::NAN), (5.0, f64::NAN)];
        assert!(fit_nelson_siegel(anchors, 2.5, None).is_err());
    }
}
