//! Fatal error taxonomy.
//!
//! Per the step pipeline's error-handling design, issues come in two
//! flavours. Event-level issues (a cash shortfall, a regulatory breach, an
//! invariant violation) are recoverable: they are pushed onto the step's
//! event stream and flip `status.has_failed`, but the step still returns a
//! valid next state. Everything in this module is the other flavour —
//! a precondition the caller violated or a numerical routine that could not
//! produce a usable result — and aborts the step instead.

use thiserror::Error;

use crate::product::ProductType;

/// Fatal error returned by the three public entry points.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A loan product has no `CashReserves` line to fund origination from,
    /// or to receive a prepayment/amortisation payment into.
    #[error("no CashReserves line present on the balance sheet")]
    MissingCashLine,

    /// A loan product was originated without a term and the config carries
    /// no default term for it.
    #[error("no default term configured for loan product {0:?}")]
    MissingDefaultTerm(ProductType),

    /// A cohort was found (or would be constructed) with `age >= term`,
    /// which violates the cohort lifecycle invariant.
    #[error("cohort for {product:?} has age {age} >= term {term}")]
    CohortAgeExceedsTerm {
        product: ProductType,
        age: u32,
        term: u32,
    },

    /// A cohort failed field-level validation (§4.2).
    #[error("cohort validation failed for {product:?}: {reason}")]
    InvalidCohort {
        product: ProductType,
        reason: String,
    },

    /// Seasoning could not land within tolerance of the target outstanding.
    #[error(
        "seasoning for {product:?} produced outstanding {actual} vs target {target} \
         (tolerance {tolerance})"
    )]
    SeasoningMismatch {
        product: ProductType,
        actual: f64,
        target: f64,
        tolerance: f64,
    },

    /// The static factor-covariance Cholesky factorization could not be
    /// completed even after diagonal-jitter retries. Per the resource model
    /// this is computed once at module load; if it fails the module must
    /// refuse to run any step.
    #[error("macro-factor covariance Cholesky factorization failed after {attempts} attempts")]
    CholeskyFailed { attempts: u32 },

    /// The Nelson-Siegel 3-point solve hit a singular system with no prior
    /// fitted curve to fall back to.
    #[error("Nelson-Siegel fit is singular and no prior curve is available to fall back to")]
    YieldCurveFitFailed,
}
