//! The static 4x4 covariance factorization for the macro factors D, S, F, R.
//!
//! Computed once, read-only thereafter (§5: "no global mutable state other
//! than the precomputed Cholesky factor"). If factorization fails even
//! after jitter retries, every caller of [`factor`] receives the same fatal
//! error, matching the "module must refuse to execute any step" policy.

use std::sync::OnceLock;

use crate::error::EngineError;

const STD_DEVS: [f64; 4] = [0.25, 0.22, 0.28, 0.08];

/// Fixed correlation matrix between D, S, F, R. Mild positive co-movement
/// between the demand and supply factors, mild negative co-movement between
/// demand and the rate factor; chosen to keep the covariance matrix
/// comfortably positive-definite while still correlating the shocks.
const CORRELATION: [[f64; 4]; 4] = [
    [1.00, 0.30, 0.20, -0.10],
    [0.30, 1.00, 0.25, -0.15],
    [0.20, 0.25, 1.00, 0.10],
    [-0.10, -0.15, 0.10, 1.00],
];

const MAX_ATTEMPTS: u32 = 8;

fn covariance(jitter: f64) -> [[f64; 4]; 4] {
    let mut cov = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            cov[i][j] = STD_DEVS[i] * STD_DEVS[j] * CORRELATION[i][j];
        }
        cov[i][i] += jitter;
    }
    cov
}

/// Attempt a Cholesky decomposition `cov = L L^T`. Returns `None` if a
/// diagonal pivot would require taking the square root of a non-positive
/// number.
fn try_cholesky(cov: &[[f64; 4]; 4]) -> Option<[[f64; 4]; 4]> {
    let mut l = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..=i {
            let mut sum = cov[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

fn compute_with_jitter_retries() -> Result<[[f64; 4]; 4], EngineError> {
    let mut jitter = 0.0;
    for attempt in 1..=MAX_ATTEMPTS {
        let cov = covariance(jitter);
        if let Some(l) = try_cholesky(&cov) {
            return Ok(l);
        }
        log::warn!("macro-factor Cholesky factorization failed on attempt {attempt}, retrying with diagonal jitter");
        jitter = if jitter == 0.0 { 1e-10 } else { jitter * 10.0 };
    }
    Err(EngineError::CholeskyFailed {
        attempts: MAX_ATTEMPTS,
    })
}

static FACTOR: OnceLock<Result<[[f64; 4]; 4], EngineError>> = OnceLock::new();

/// The lower-triangular factor `L` such that `L L^T` equals the static
/// factor covariance matrix. Computed on first use and cached thereafter.
pub fn factor() -> Result<[[f64; 4]; 4], EngineError> {
    FACTOR.get_or_init(compute_with_jitter_retries).clone()
}

/// `L * z` for a 4-vector `z`.
pub fn apply(l: &[[f64; 4]; 4], z: [f64; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for i in 0..4 {
        for j in 0..=i {
            out[i] += l[i][j] * z[j];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_reconstructs_the_covariance_matrix() {
        let l = factor().unwrap();
        let cov = covariance(0.0);
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += l[i][k] * l[j][k];
                }
                assert!((sum - cov[i][j]).abs() < 1e-9, "mismatch at ({i},{j})");
            }
        }
    }

    #[test]
    fn singular_matrix_falls_back_via_jitter() {
        let singular = [[0.0; 4]; 4];
        assert!(try_cholesky(&singular).is_none());
        // Jittered diagonal should factor successfully.
        let mut jittered = singular;
        for i in 0..4 {
            jittered[i][i] = 1e-6;
        }
        assert!(try_cholesky(&jittered).is_some());
    }

    #[test]
    fn factor_is_cached_across_calls() {
        let a = factor().unwrap();
        let b = factor().unwrap();
        assert_eq!(a, b);
    }
}
