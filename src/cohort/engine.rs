//! Cohort-level operations: balance sync, origination, prepayment, and the
//! monthly amortisation/default step (§4.2).

use crate::balance_sheet::BalanceSheet;
use crate::config::Config;
use crate::cohort::types::{CohortBook, LoanCohort};
use crate::error::EngineError;
use crate::product::ProductType;
use crate::shocks::ShockContext;

/// Recompute every loan product's balance-sheet balance from its cohort
/// sum. Non-loan products are untouched.
pub fn sync_balances(book: &CohortBook, sheet: &mut BalanceSheet) {
    for product in ProductType::ALL {
        if !product.is_loan() {
            continue;
        }
        let total = book.outstanding_total(product);
        let item = sheet.entry_or_insert(product, || {
            crate::balance_sheet::BalanceSheetItem::new(0.0, 0.0, Default::default())
        });
        item.balance = total;
    }
}

/// Originate (or top up) a cohort. Returns the amount actually funded.
#[allow(clippy::too_many_arguments)]
pub fn originate(
    book: &mut CohortBook,
    sheet: &mut BalanceSheet,
    config: &Config,
    product: ProductType,
    cohort_id: i64,
    requested_principal: f64,
    rate: f64,
    term_override: Option<u32>,
    annual_pd: f64,
    lgd: f64,
) -> Result<f64, EngineError> {
    let available = sheet
        .get(ProductType::CashReserves)
        .ok_or(EngineError::MissingCashLine)?
        .balance;

    let funded = requested_principal.max(0.0).min(available.max(0.0));
    if funded <= 0.0 {
        return Ok(0.0);
    }

    let term_months = term_override
        .unwrap_or(
            config
                .default_term_months(product)
                .ok_or(EngineError::MissingDefaultTerm(product))?,
        )
        .min(config.max_term_months(product))
        .min(420);

    sheet
        .get_mut(ProductType::CashReserves)
        .expect("checked above")
        .balance -= funded;

    let cohorts = book.cohorts_mut(product);
    if let Some(existing) = cohorts.iter_mut().find(|c| c.cohort_id == cohort_id) {
        let old = existing.outstanding_principal;
        let new_total = old + funded;
        existing.annual_interest_rate = blend(existing.annual_interest_rate, old, rate, funded, new_total);
        existing.annual_pd = blend(existing.annual_pd, old, annual_pd, funded, new_total);
        existing.lgd = blend(existing.lgd, old, lgd, funded, new_total);
        existing.original_principal += funded;
        existing.outstanding_principal = new_total;
        existing.term_months = existing.term_months.max(term_months);
        existing.age_months = 0;
    } else {
        cohorts.push(LoanCohort {
            product,
            cohort_id,
            original_principal: funded,
            outstanding_principal: funded,
            annual_interest_rate: rate,
            term_months,
            age_months: 0,
            annual_pd,
            lgd,
        });
    }

    sync_balances(book, sheet);
    Ok(funded)
}

fn blend(old_value: f64, old_weight: f64, new_value: f64, new_weight: f64, total_weight: f64) -> f64 {
    if total_weight <= 0.0 {
        new_value
    } else {
        (old_value * old_weight + new_value * new_weight) / total_weight
    }
}

/// Prepay against a loan product's cohorts, pro-rata by outstanding, the
/// final cohort absorbing any residual. A no-op for non-loan products.
/// Returns the amount actually paid.
pub fn prepay(book: &mut CohortBook, sheet: &mut BalanceSheet, product: ProductType, requested_amount: f64) -> f64 {
    if !product.is_loan() {
        return 0.0;
    }
    let total = book.outstanding_total(product);
    let paid = requested_amount.max(0.0).min(total);
    if paid <= 0.0 {
        return 0.0;
    }

    let cohorts = book.cohorts_mut(product);
    let n = cohorts.len();
    let mut allocated = 0.0;
    for (i, cohort) in cohorts.iter_mut().enumerate() {
        let share = if i + 1 == n {
            (paid - allocated).max(0.0)
        } else {
            (cohort.outstanding_principal / total) * paid
        };
        let share = share.min(cohort.outstanding_principal);
        cohort.outstanding_principal -= share;
        allocated += share;
    }
    cohorts.retain(|c| c.outstanding_principal > 1e-2);

    sheet
        .entry_or_insert(ProductType::CashReserves, || {
            crate::balance_sheet::BalanceSheetItem::new(0.0, 0.0, Default::default())
        })
        .balance += paid;

    sync_balances(book, sheet);
    paid
}

/// Outcome of one `step_cohorts` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortStepResult {
    pub loan_interest_income: f64,
    pub recognized_loan_losses: f64,
}

/// Fixed-payment amortisation with a linear fallback at (near) zero rate.
fn amortising_payment(outstanding: f64, monthly_rate: f64, remaining: u32) -> f64 {
    if remaining == 0 {
        return outstanding;
    }
    if monthly_rate.abs() < 1e-12 {
        return outstanding / remaining as f64;
    }
    let factor = (1.0 + monthly_rate).powi(-(remaining as i32));
    outstanding * monthly_rate / (1.0 - factor)
}

/// Run `dt_months` amortisation/default ticks across every loan product's
/// cohorts, then apply `shock_ctx`'s extra losses once, prune dead cohorts
/// and re-sync balances.
pub fn step_cohorts(
    book: &mut CohortBook,
    sheet: &mut BalanceSheet,
    dt_months: u32,
    shock_ctx: &ShockContext,
) -> Vec<(ProductType, CohortStepResult)> {
    let mut results: Vec<(ProductType, CohortStepResult)> = ProductType::ALL
        .into_iter()
        .filter(|p| p.is_loan())
        .map(|p| (p, CohortStepResult::default()))
        .collect();

    for product in ProductType::ALL {
        if !product.is_loan() {
            continue;
        }
        let result = results.iter_mut().find(|(p, _)| *p == product).map(|(_, r)| r).expect("present");

        for _ in 0..dt_months {
            let mut cash_credit = 0.0;
            for cohort in book.cohorts_mut(product).iter_mut() {
                if cohort.outstanding_principal <= 0.0 || cohort.age_months >= cohort.term_months {
                    continue;
                }
                let r = cohort.annual_interest_rate / 12.0;
                let remaining = cohort.term_months - cohort.age_months;
                let pmt = amortising_payment(cohort.outstanding_principal, r, remaining);
                let interest = cohort.outstanding_principal * r;
                let principal = (pmt - interest).max(0.0).min(cohort.outstanding_principal);

                cohort.outstanding_principal -= principal;
                cash_credit += interest + principal;
                result.loan_interest_income += interest;

                let pd_eff = (cohort.annual_pd * shock_ctx.pd_multiplier).clamp(0.0, 0.999999);
                let monthly_pd = 1.0 - (1.0 - pd_eff).powf(1.0 / 12.0);
                let defaulted = cohort.outstanding_principal * monthly_pd;

                if defaulted > 0.0 {
                    let lgd_eff = (cohort.lgd * shock_ctx.lgd_multiplier).clamp(0.0, 1.0);
                    let loss = defaulted * lgd_eff;
                    let recovery = defaulted - loss;
                    cohort.outstanding_principal -= defaulted;
                    cash_credit += recovery;
                    result.recognized_loan_losses += loss;
                }

                cohort.age_months += 1;
            }
            sheet
                .entry_or_insert(ProductType::CashReserves, || {
                    crate::balance_sheet::BalanceSheetItem::new(0.0, 0.0, Default::default())
                })
                .balance += cash_credit;
        }
    }

    for product in ProductType::ALL {
        if !product.is_loan() {
            continue;
        }
        let extra_loss = shock_ctx.extra_loss_for(product);
        if extra_loss <= 0.0 {
            continue;
        }
        let total = book.outstanding_total(product);
        let write_down = extra_loss.min(total);
        if write_down <= 0.0 {
            continue;
        }
        let cohorts = book.cohorts_mut(product);
        let n = cohorts.len();
        let mut allocated = 0.0;
        for (i, cohort) in cohorts.iter_mut().enumerate() {
            let share = if i + 1 == n {
                (write_down - allocated).max(0.0)
            } else {
                (cohort.outstanding_principal / total) * write_down
            };
            let share = share.min(cohort.outstanding_principal);
            cohort.outstanding_principal -= share;
            allocated += share;
        }
        if let Some((_, result)) = results.iter_mut().find(|(p, _)| *p == product) {
            result.recognized_loan_losses += write_down;
        }
    }

    for product in ProductType::ALL {
        if !product.is_loan() {
            continue;
        }
        book.cohorts_mut(product)
            .retain(|c| c.outstanding_principal > 1e-2 && c.age_months < c.term_months);
    }
    sync_balances(book, sheet);

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};
    use approx::assert_relative_eq;

    fn sheet_with_cash(cash: f64) -> BalanceSheet {
        let mut sheet = BalanceSheet::new();
        sheet.set(
            ProductType::CashReserves,
            BalanceSheetItem::new(cash, 0.0, LiquidityTag::default()),
        );
        sheet
    }

    #[test]
    fn origination_funds_from_available_cash_only() {
        let mut book = CohortBook::new();
        let mut sheet = sheet_with_cash(100.0);
        let config = Config::default();
        let funded = originate(
            &mut book, &mut sheet, &config, ProductType::Mortgages, 1, 500.0, 0.04, None, 0.01, 0.3,
        )
        .unwrap();
        assert_eq!(funded, 100.0);
        assert_eq!(sheet.cash_balance(), 0.0);
        assert_eq!(book.outstanding_total(ProductType::Mortgages), 100.0);
    }

    #[test]
    fn prepay_removes_fully_paid_cohort() {
        let mut book = CohortBook::new();
        book.cohorts_mut(ProductType::Mortgages).push(LoanCohort {
            product: ProductType::Mortgages,
            cohort_id: 1,
            original_principal: 100.0,
            outstanding_principal: 100.0,
            annual_interest_rate: 0.04,
            term_months: 360,
            age_months: 5,
            annual_pd: 0.01,
            lgd: 0.3,
        });
        let mut sheet = sheet_with_cash(0.0);
        sheet.set(
            ProductType::Mortgages,
            BalanceSheetItem::new(100.0, 0.04, LiquidityTag::default()),
        );
        let paid = prepay(&mut book, &mut sheet, ProductType::Mortgages, 100.0);
        assert_eq!(paid, 100.0);
        assert_eq!(book.outstanding_total(ProductType::Mortgages), 0.0);
        assert_eq!(sheet.cash_balance(), 100.0);
    }

    #[test]
    fn amortisation_law_one_month_no_losses() {
        let principal = 1_000_000.0_f64;
        let annual_rate = 0.06;
        let term = 360_u32;
        let mut book = CohortBook::new();
        book.cohorts_mut(ProductType::Mortgages).push(LoanCohort {
            product: ProductType::Mortgages,
            cohort_id: 1,
            original_principal: principal,
            outstanding_principal: principal,
            annual_interest_rate: annual_rate,
            term_months: term,
            age_months: 0,
            annual_pd: 0.0,
            lgd: 0.0,
        });
        let mut sheet = sheet_with_cash(0.0);
        sheet.set(
            ProductType::Mortgages,
            BalanceSheetItem::new(principal, annual_rate, LiquidityTag::default()),
        );

        let ctx = ShockContext {
            pd_multiplier: 0.0,
            lgd_multiplier: 0.0,
            ..ShockContext::default()
        };
        let results = step_cohorts(&mut book, &mut sheet, 1, &ctx);

        let r = annual_rate / 12.0;
        let expected_pmt = principal * r / (1.0 - (1.0 + r).powi(-(term as i32)));
        let expected_interest = principal * r;

        assert_relative_eq!(sheet.cash_balance(), expected_pmt, epsilon = 1e-6);
        let (_, result) = results.iter().find(|(p, _)| *p == ProductType::Mortgages).unwrap();
        assert_relative_eq!(result.loan_interest_income, expected_interest, epsilon = 1e-6);
        let new_outstanding = book.outstanding_total(ProductType::Mortgages);
        assert_relative_eq!(
            new_outstanding,
            principal - (expected_pmt - expected_interest),
            epsilon = 1e-6
        );
        assert_eq!(book.cohorts(ProductType::Mortgages)[0].age_months, 1);
    }

    #[test]
    fn zero_dt_months_ages_nothing() {
        let mut book = CohortBook::new();
        book.cohorts_mut(ProductType::Mortgages).push(LoanCohort {
            product: ProductType::Mortgages,
            cohort_id: 1,
            original_principal: 100.0,
            outstanding_principal: 100.0,
            annual_interest_rate: 0.05,
            term_months: 360,
            age_months: 10,
            annual_pd: 0.01,
            lgd: 0.3,
        });
        let mut sheet = sheet_with_cash(0.0);
        sheet.set(
            ProductType::Mortgages,
            BalanceSheetItem::new(100.0, 0.05, LiquidityTag::default()),
        );
        let ctx = ShockContext::default();
        let results = step_cohorts(&mut book, &mut sheet, 0, &ctx);
        assert_eq!(book.cohorts(ProductType::Mortgages)[0].age_months, 10);
        assert_eq!(sheet.cash_balance(), 0.0);
        let (_, result) = results.iter().find(|(p, _)| *p == ProductType::Mortgages).unwrap();
        assert_eq!(result.loan_interest_income, 0.0);
    }
}
