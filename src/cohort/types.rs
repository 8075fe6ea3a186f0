//! Loan cohort records and the per-product ordered book that holds them.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::product::ProductType;

/// A bucket of loans sharing product, rate, term, age, PD and LGD, tracked
/// as a single principal line (§3 LoanCohort).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoanCohort {
    pub product: ProductType,
    pub cohort_id: i64,
    pub original_principal: f64,
    pub outstanding_principal: f64,
    pub annual_interest_rate: f64,
    pub term_months: u32,
    pub age_months: u32,
    pub annual_pd: f64,
    pub lgd: f64,
}

impl LoanCohort {
    /// Validate every field invariant from §4.2's Validation paragraph.
    pub fn validate(&self, max_term_months: u32) -> Result<(), EngineError> {
        let reason = if !self.original_principal.is_finite()
            || !self.outstanding_principal.is_finite()
            || !self.annual_interest_rate.is_finite()
            || !self.annual_pd.is_finite()
            || !self.lgd.is_finite()
        {
            Some("non-finite field".to_string())
        } else if self.outstanding_principal > self.original_principal + 1e-3 {
            Some(format!(
                "outstanding {} exceeds original {}",
                self.outstanding_principal, self.original_principal
            ))
        } else if self.annual_interest_rate < 0.0 {
            Some("negative annual rate".to_string())
        } else if self.term_months == 0 || self.term_months > max_term_months.min(420) {
            Some(format!(
                "term {} outside (0, {}]",
                self.term_months,
                max_term_months.min(420)
            ))
        } else if self.age_months >= self.term_months {
            return Err(EngineError::CohortAgeExceedsTerm {
                product: self.product,
                age: self.age_months,
                term: self.term_months,
            });
        } else if !(0.0..1.0).contains(&self.annual_pd) {
            Some(format!("annualPd {} outside [0, 1)", self.annual_pd))
        } else if !(0.0..=1.0).contains(&self.lgd) {
            Some(format!("lgd {} outside [0, 1]", self.lgd))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(EngineError::InvalidCohort {
                product: self.product,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Per-product ordered collection of cohorts, keyed by `ProductType`, kept
/// in insertion order like [`crate::balance_sheet::BalanceSheet`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohortBook {
    entries: Vec<(ProductType, Vec<LoanCohort>)>,
}

impl CohortBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cohorts(&self, product: ProductType) -> &[LoanCohort] {
        self.entries
            .iter()
            .find(|(p, _)| *p == product)
            .map(|(_, c)| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn cohorts_mut(&mut self, product: ProductType) -> &mut Vec<LoanCohort> {
        if !self.entries.iter().any(|(p, _)| *p == product) {
            self.entries.push((product, Vec::new()));
        }
        self.entries
            .iter_mut()
            .find(|(p, _)| *p == product)
            .map(|(_, c)| c)
            .expect("just inserted")
    }

    /// Total outstanding across every cohort of `product`.
    pub fn outstanding_total(&self, product: ProductType) -> f64 {
        self.cohorts(product).iter().map(|c| c.outstanding_principal).sum()
    }

    /// Iterate products with at least one cohort, in insertion order.
    pub fn products(&self) -> impl Iterator<Item = ProductType> + '_ {
        self.entries.iter().map(|(p, _)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductType, &[LoanCohort])> {
        self.entries.iter().map(|(p, c)| (*p, c.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(age: u32, term: u32) -> LoanCohort {
        LoanCohort {
            product: ProductType::Mortgages,
            cohort_id: 0,
            original_principal: 100.0,
            outstanding_principal: 90.0,
            annual_interest_rate: 0.05,
            term_months: term,
            age_months: age,
            annual_pd: 0.01,
            lgd: 0.3,
        }
    }

    #[test]
    fn valid_cohort_passes() {
        assert!(sample(5, 360).validate(420).is_ok());
    }

    #[test]
    fn age_at_or_past_term_is_rejected() {
        assert!(sample(360, 360).validate(420).is_err());
    }

    #[test]
    fn book_preserves_product_insertion_order() {
        let mut book = CohortBook::new();
        book.cohorts_mut(ProductType::CorporateLoans).push(sample(1, 60));
        book.cohorts_mut(ProductType::Mortgages).push(sample(1, 360));
        let order: Vec<_> = book.products().collect();
        assert_eq!(order, vec![ProductType::CorporateLoans, ProductType::Mortgages]);
    }
}
