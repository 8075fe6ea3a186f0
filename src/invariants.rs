//! Post-step invariant checking (§4.6, §8 universal invariants).

use crate::product::ProductType;
use crate::state::BankState;

/// Run every invariant check and return human-readable messages for each
/// violation. An empty vector means the state is internally consistent.
pub fn check_invariants(state: &BankState) -> Vec<String> {
    let mut errors = Vec::new();

    let assets = state.balance_sheet.total_assets();
    let liabilities = state.balance_sheet.total_liabilities();
    let equity = state.capital.cet1 + state.capital.at1;
    if (assets - (liabilities + equity)).abs() > 1.0 {
        errors.push(format!(
            "balance-sheet identity violated: assets {assets} vs liabilities+equity {}",
            liabilities + equity
        ));
    }

    for (product, item) in state.balance_sheet.iter() {
        if item.balance < -1e-6 {
            errors.push(format!("{:?} has negative balance {}", product, item.balance));
        }
    }

    for product in ProductType::ALL {
        if !product.is_loan() {
            continue;
        }
        let cohort_total = state.cohorts.outstanding_total(product);
        let sheet_balance = state
            .balance_sheet
            .get(product)
            .map(|item| item.balance)
            .unwrap_or(0.0);
        let tolerance = (1e-3_f64).max(1e-6 * sheet_balance.abs());
        if (cohort_total - sheet_balance).abs() > tolerance {
            errors.push(format!(
                "{:?} cohort sum {cohort_total} disagrees with balance-sheet balance {sheet_balance}",
                product
            ));
        }
    }

    for (name, value) in [
        ("cet1Ratio", state.risk_metrics.cet1_ratio),
        ("leverageRatio", state.risk_metrics.leverage_ratio),
        ("lcr", state.risk_metrics.lcr),
        ("nsfr", state.risk_metrics.nsfr),
    ] {
        if value.is_nan() {
            errors.push(format!("{name} is NaN"));
        } else if value == f64::NEG_INFINITY {
            errors.push(format!("{name} is -Infinity"));
        }
    }

    errors
}
