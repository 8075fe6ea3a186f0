//! Construction of the opening bank state and scenario application (§6
//! `initial_seasoned_portfolio`, `apply_scenario`).

use rayon::prelude::*;

use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};
use crate::cohort::{generate_seasoned, sync_balances, CohortBook};
use crate::config::{Config, ScenarioOverrides};
use crate::error::EngineError;
use crate::product::ProductType;
use crate::risk::{compute_risk_metrics, evaluate_compliance};
use crate::state::{BankState, CapitalState};

/// Target opening balance for each product, at a fixed illustrative scale.
/// Assets sum to 110bn, liabilities to 102bn, leaving 8bn of opening
/// capital - the balance-sheet identity this module is responsible for
/// establishing on day one.
const CASH_RESERVES: f64 = 15e9;
const GILTS: f64 = 20e9;
const MORTGAGES: f64 = 45e9;
const CORPORATE_LOANS: f64 = 25e9;
const REVERSE_REPO: f64 = 5e9;
const RETAIL_DEPOSITS: f64 = 50e9;
const CORPORATE_DEPOSITS: f64 = 30e9;
const WHOLESALE_ST: f64 = 8e9;
const WHOLESALE_LT: f64 = 12e9;
const REPOS: f64 = 2e9;
const OPENING_CET1: f64 = 7e9;
const OPENING_AT1: f64 = 1e9;

fn non_loan_item(config: &Config, product: ProductType, balance: f64, rate: f64) -> BalanceSheetItem {
    BalanceSheetItem::new(balance, rate, config.liquidity_tag(product))
}

/// Build a fresh, internally-consistent opening `BankState`: a balance
/// sheet at the fixed illustrative scale above, with `Mortgages` and
/// `CorporateLoans` backed by seasoned cohort books rather than a single
/// bullet cohort, default market and capital starting points, and risk
/// metrics computed for that opening position.
pub fn initial_seasoned_portfolio(config: &Config, seed_override: Option<i32>) -> Result<BankState, EngineError> {
    let mut state = BankState::default();
    let base_seed = seed_override.unwrap_or(config.global.initial_portfolio_seed);

    let market = &state.market;
    let mut sheet = state.balance_sheet.clone();
    sheet.set(
        ProductType::CashReserves,
        non_loan_item(config, ProductType::CashReserves, CASH_RESERVES, market.base_rate),
    );
    sheet.set(
        ProductType::Gilts,
        non_loan_item(config, ProductType::Gilts, GILTS, market.gilt_curve.y5),
    );
    sheet.set(
        ProductType::ReverseRepo,
        non_loan_item(config, ProductType::ReverseRepo, REVERSE_REPO, market.base_rate),
    );
    sheet.set(
        ProductType::RetailDeposits,
        non_loan_item(
            config,
            ProductType::RetailDeposits,
            RETAIL_DEPOSITS,
            market.competitor_rates.retail_deposit,
        ),
    );
    sheet.set(
        ProductType::CorporateDeposits,
        non_loan_item(
            config,
            ProductType::CorporateDeposits,
            CORPORATE_DEPOSITS,
            market.competitor_rates.corporate_deposit.unwrap_or(market.competitor_rates.retail_deposit + 0.005),
        ),
    );
    sheet.set(
        ProductType::WholesaleFundingST,
        non_loan_item(
            config,
            ProductType::WholesaleFundingST,
            WHOLESALE_ST,
            market.base_rate + market.spreads.wholesale,
        ),
    );
    sheet.set(
        ProductType::WholesaleFundingLT,
        non_loan_item(
            config,
            ProductType::WholesaleFundingLT,
            WHOLESALE_LT,
            market.risk_free_long + market.spreads.senior_debt,
        ),
    );
    sheet.set(
        ProductType::RepurchaseAgreements,
        non_loan_item(config, ProductType::RepurchaseAgreements, REPOS, market.base_rate + market.repo_haircuts.gilt),
    );
    sheet.set(
        ProductType::Mortgages,
        non_loan_item(config, ProductType::Mortgages, MORTGAGES, market.competitor_rates.mortgage),
    );
    sheet.set(
        ProductType::CorporateLoans,
        non_loan_item(
            config,
            ProductType::CorporateLoans,
            CORPORATE_LOANS,
            market.risk_free_long + market.spreads.corporate_loan,
        ),
    );

    let mortgage_params = config.product_parameters(ProductType::Mortgages);
    let corporate_params = config.product_parameters(ProductType::CorporateLoans);
    let mortgage_rate = market.competitor_rates.mortgage;
    let corporate_rate = market.risk_free_long + market.spreads.corporate_loan;

    let (mortgage_cohorts, corporate_cohorts) = rayon::join(
        || {
            generate_seasoned(
                ProductType::Mortgages,
                MORTGAGES,
                mortgage_rate,
                mortgage_params.base_default_rate,
                mortgage_params.loss_given_default,
                config,
                base_seed,
            )
        },
        || {
            generate_seasoned(
                ProductType::CorporateLoans,
                CORPORATE_LOANS,
                corporate_rate,
                corporate_params.base_default_rate,
                corporate_params.loss_given_default,
                config,
                base_seed + 1,
            )
        },
    );

    let mut cohorts = CohortBook::new();
    *cohorts.cohorts_mut(ProductType::Mortgages) = mortgage_cohorts?;
    *cohorts.cohorts_mut(ProductType::CorporateLoans) = corporate_cohorts?;
    sync_balances(&cohorts, &mut sheet);

    state.balance_sheet = sheet;
    state.cohorts = cohorts;
    state.capital = CapitalState {
        cet1: OPENING_CET1,
        at1: OPENING_AT1,
    };
    state.risk_metrics = compute_risk_metrics(&state.balance_sheet, config, state.capital.cet1, state.capital.at1, 1.0);
    state.compliance = evaluate_compliance(&state.risk_metrics, &config.risk_limits);

    Ok(state)
}

/// Fold `overrides` onto `config` and onto a clone of `initial_state` (§6):
/// balance-sheet items are matched by product, everything else is merged
/// field-by-field as a whole-record replacement. The caller re-derives risk
/// metrics and compliance on the next `step` call. Kept as a pure function
/// so scenario construction stays side-effect free and reproducible.
pub fn apply_scenario(config: &Config, initial_state: &BankState, overrides: &ScenarioOverrides) -> (Config, BankState) {
    let mut state = initial_state.clone();

    for (product, item) in &overrides.balance_sheet_items {
        state.balance_sheet.set(*product, *item);
    }
    if let Some(capital) = overrides.capital {
        state.capital = capital;
    }
    if let Some(income_statement) = overrides.income_statement {
        state.income_statement = income_statement;
    }
    if let Some(cash_flow_statement) = overrides.cash_flow_statement {
        state.cash_flow_statement = cash_flow_statement;
    }
    if let Some(market) = overrides.market {
        state.market = market;
    }
    if let Some(behaviour_state) = overrides.behaviour_state {
        state.behaviour = behaviour_state;
    }
    if let Some(status) = overrides.status {
        state.status = status;
    }

    (config.merged_with(overrides), state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_balance_sheet_identity_holds() {
        let config = Config::default();
        let state = initial_seasoned_portfolio(&config, Some(7)).unwrap();
        let assets = state.balance_sheet.total_assets();
        let liabilities = state.balance_sheet.total_liabilities();
        let equity = state.capital.cet1 + state.capital.at1;
        assert!((assets - (liabilities + equity)).abs() <= 1.0);
    }

    #[test]
    fn loan_balances_match_cohort_sums() {
        let config = Config::default();
        let state = initial_seasoned_portfolio(&config, Some(7)).unwrap();
        for product in [ProductType::Mortgages, ProductType::CorporateLoans] {
            let sheet_balance = state.balance_sheet.get(product).unwrap().balance;
            let cohort_sum = state.cohorts.outstanding_total(product);
            assert!((sheet_balance - cohort_sum).abs() <= 1.0);
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let config = Config::default();
        let a = initial_seasoned_portfolio(&config, Some(11)).unwrap();
        let b = initial_seasoned_portfolio(&config, Some(11)).unwrap();
        assert_eq!(a.cohorts.outstanding_total(ProductType::Mortgages), b.cohorts.outstanding_total(ProductType::Mortgages));
    }

    #[test]
    fn apply_scenario_overrides_risk_limits_without_touching_unrelated_state() {
        let config = Config::default();
        let state = initial_seasoned_portfolio(&config, Some(3)).unwrap();
        let mut overrides = ScenarioOverrides::default();
        overrides.risk_limits = Some(crate::config::RiskLimits {
            min_cet1_ratio: 0.1,
            ..config.risk_limits
        });
        let (merged, same_state) = apply_scenario(&config, &state, &overrides);
        assert_eq!(merged.risk_limits.min_cet1_ratio, 0.1);
        assert_eq!(same_state.cash_balance(), state.cash_balance());
    }

    #[test]
    fn apply_scenario_merges_state_shaped_overrides() {
        let config = Config::default();
        let state = initial_seasoned_portfolio(&config, Some(3)).unwrap();
        let mut overrides = ScenarioOverrides::default();
        overrides.capital = Some(crate::state::CapitalState { cet1: 1.0, at1: 0.0 });
        overrides.balance_sheet_items.push((
            ProductType::Gilts,
            crate::balance_sheet::BalanceSheetItem::new(1_234.0, 0.02, crate::balance_sheet::LiquidityTag::default()),
        ));
        overrides.status = Some(crate::state::Status {
            is_in_resolution: true,
            has_failed: false,
        });

        let (_, scenario_state) = apply_scenario(&config, &state, &overrides);

        assert_eq!(scenario_state.capital.cet1, 1.0);
        assert_eq!(scenario_state.balance_sheet.get(ProductType::Gilts).unwrap().balance, 1_234.0);
        assert!(scenario_state.status.is_in_resolution);
        // Fields not named by the overrides are left untouched.
        assert_eq!(scenario_state.capital.at1, state.capital.at1);
        assert_eq!(
            scenario_state.balance_sheet.get(ProductType::Mortgages).unwrap().balance,
            state.balance_sheet.get(ProductType::Mortgages).unwrap().balance
        );
    }
}
