//! The orchestrating step function (§4.5).

use crate::actions::PlayerAction;
use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};
use crate::cohort;
use crate::config::Config;
use crate::error::EngineError;
use crate::events::Event;
use crate::invariants::check_invariants;
use crate::market;
use crate::product::{ProductType, Side};
use crate::risk;
use crate::shocks::Shock;
use crate::state::{BankState, IncomeStatement};
use crate::step::actions_apply::apply_actions;
use crate::step::behaviour::{apply_deposit_behaviour, apply_loan_behaviour};
use crate::step::shocks_apply::apply_shocks;
use crate::step::statements::build_cash_flow_statement;

/// Advance the bank one step: clone, sync, shocks, actions, behaviour,
/// cohort amortisation, P&L accrual, loss recognition, capital close,
/// metrics, statements, invariants, market advance.
pub fn step(
    state: &BankState,
    config: &Config,
    actions: &[PlayerAction],
    shocks: &[Shock],
) -> Result<(BankState, Vec<Event>), EngineError> {
    let mut events = Vec::new();

    // 1. Clone.
    let mut next = state.deep_clone();
    let cash_start = state.cash_balance();
    log::debug!("step {}: cloned state, cashStart={cash_start:.2}", state.clock.step);

    // 2. Sync.
    cohort::sync_balances(&next.cohorts, &mut next.balance_sheet);

    let dt_months = next.clock.step_length_months as f64;
    let dt_months_int = dt_months.round().max(0.0) as u32;
    let dt_years = dt_months / 12.0;

    // 3. Shocks.
    let shock_ctx = apply_shocks(&mut next, config, shocks, &mut events);

    // 4. Actions.
    apply_actions(&mut next, config, actions, &mut events)?;

    // 5. Deposit behaviour.
    apply_deposit_behaviour(&mut next, config, dt_months, &mut events);

    // 6. Loan behaviour.
    apply_loan_behaviour(&mut next, config, dt_months, &mut events)?;

    // 7. Cohort step.
    let cohort_results = cohort::step_cohorts(&mut next.cohorts, &mut next.balance_sheet, dt_months_int, &shock_ctx);
    let loan_interest_income: f64 = cohort_results.iter().map(|(_, r)| r.loan_interest_income).sum();
    let mut non_cash_losses: Vec<(ProductType, f64)> = cohort_results
        .iter()
        .map(|(p, r)| (*p, r.recognized_loan_losses))
        .collect();

    // 8. Accrue P&L.
    let mut non_loan_interest_income = 0.0;
    let mut interest_expense = 0.0;
    for (product, item) in next.balance_sheet.iter() {
        match product.side() {
            Side::Asset if !product.is_loan() => {
                non_loan_interest_income += item.balance * item.interest_rate * dt_years;
            }
            Side::Liability => {
                interest_expense += item.balance * item.interest_rate * dt_years;
            }
            _ => {}
        }
    }

    // 9. Recognise losses.
    let mut credit_losses: f64 = non_cash_losses.iter().map(|(_, loss)| *loss).sum();
    for product in ProductType::ALL {
        if product.is_loan() {
            continue;
        }
        let extra = shock_ctx.extra_loss_for(product);
        if extra <= 0.0 {
            continue;
        }
        let balance = next.balance_sheet.get(product).map(|i| i.balance).unwrap_or(0.0);
        let recognised = extra.min(balance);
        if let Some(item) = next.balance_sheet.get_mut(product) {
            item.balance -= recognised;
        }
        credit_losses += recognised;
        non_cash_losses.push((product, recognised));
    }

    // 10. Close capital.
    let loan_book: f64 = ProductType::ALL
        .into_iter()
        .filter(|p| p.is_loan())
        .map(|p| next.balance_sheet.get(p).map(|i| i.balance).unwrap_or(0.0))
        .sum();
    let fee = config.behaviour.loan_fee_rate_monthly * dt_months * loan_book;
    let total_assets = next.balance_sheet.total_assets();
    let op_ex = config.global.operating_cost_ratio * total_assets * dt_years
        + config.global.fixed_operating_cost_per_month * dt_months;
    let total_interest_income = non_loan_interest_income + loan_interest_income;
    let nii = total_interest_income - interest_expense;
    let pre_tax = nii + fee - credit_losses - op_ex;
    let tax = pre_tax.max(0.0) * config.global.tax_rate;
    let net_income = pre_tax - tax;

    next.income_statement = IncomeStatement {
        interest_income: total_interest_income,
        interest_expense,
        net_interest_income: nii,
        fee_income: fee,
        credit_losses,
        operating_expenses: op_ex,
        pre_tax_profit: pre_tax,
        tax,
        net_income,
    };
    next.capital.cet1 += net_income;

    let operating_cash_delta = total_interest_income - interest_expense + fee - op_ex - tax;
    let cash_adjustment = operating_cash_delta - loan_interest_income;
    {
        let cash = next
            .balance_sheet
            .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()));
        cash.balance += cash_adjustment;
        if cash.balance < -1e-6 {
            events.push(Event::error(format!(
                "cash balance went negative after P&L close: {:.2}",
                cash.balance
            )));
            next.status.flag_failure();
        }
    }

    // 11. Metrics.
    next.risk_metrics = risk::compute_risk_metrics(
        &next.balance_sheet,
        config,
        next.capital.cet1,
        next.capital.at1,
        shock_ctx.lcr_outflow_multiplier,
    );
    next.compliance = risk::evaluate_compliance(&next.risk_metrics, &config.risk_limits);
    if next.compliance.any_breach() {
        events.push(Event::error("Regulatory breach: your bank has failed!"));
        next.status.flag_failure();
    }

    // 12. Statements.
    next.clock.advance();
    next.cash_flow_statement = build_cash_flow_statement(
        state,
        &mut next,
        cash_start,
        operating_cash_delta,
        net_income,
        &non_cash_losses,
        &config.tolerances,
        &mut events,
    );

    // 13. Invariants.
    for message in check_invariants(&next) {
        events.push(Event::error(message));
        next.status.flag_failure();
    }

    // 14. Market. Runs after the state is otherwise frozen so this step's
    // metrics and cash flows reflect the pre-advance market.
    market::advance_market(&mut next.market, dt_months)?;

    Ok((next, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::portfolio::initial_seasoned_portfolio;

    fn reference_state() -> BankState {
        initial_seasoned_portfolio(&Config::default(), None).unwrap()
    }

    #[test]
    fn step_with_no_actions_or_shocks_preserves_balance_sheet_identity() {
        let config = Config::default();
        let state = reference_state();
        let (next, _events) = step(&state, &config, &[], &[]).unwrap();
        let assets = next.balance_sheet.total_assets();
        let liabilities = next.balance_sheet.total_liabilities();
        let equity = next.capital.cet1 + next.capital.at1;
        assert!((assets - (liabilities + equity)).abs() <= 1.0);
    }

    #[test]
    fn step_is_deterministic_for_identical_inputs() {
        let config = Config::default();
        let state = reference_state();
        let (a, events_a) = step(&state, &config, &[], &[]).unwrap();
        let (b, events_b) = step(&state, &config, &[], &[]).unwrap();
        assert_eq!(a.cash_balance(), b.cash_balance());
        assert_eq!(a.capital.cet1, b.capital.cet1);
        assert_eq!(a.market.macro_model.rng_seed, b.market.macro_model.rng_seed);
        assert_eq!(events_a.len(), events_b.len());
    }

    #[test]
    fn retail_rate_advantage_grows_retail_deposits_more() {
        let config = Config::default();
        let state = reference_state();
        let competitor = state.market.competitor_rates.retail_deposit;

        let (low, _) = step(
            &state,
            &config,
            &[PlayerAction::AdjustRate {
                product: ProductType::RetailDeposits,
                rate: competitor,
            }],
            &[],
        )
        .unwrap();
        let (high, _) = step(
            &state,
            &config,
            &[PlayerAction::AdjustRate {
                product: ProductType::RetailDeposits,
                rate: competitor + 0.01,
            }],
            &[],
        )
        .unwrap();

        let low_balance = low.balance_sheet.get(ProductType::RetailDeposits).unwrap().balance;
        let high_balance = high.balance_sheet.get(ProductType::RetailDeposits).unwrap().balance;
        assert!(high_balance > low_balance);
    }

    #[test]
    fn macro_downturn_reduces_cet1_and_cet1_ratio() {
        let config = Config::default();
        let state = reference_state();
        let (baseline, _) = step(&state, &config, &[], &[]).unwrap();
        let (downturn, _) = step(
            &state,
            &config,
            &[],
            &[Shock::MacroDownturn {
                pd_mult: 3.0,
                lgd_mult: 2.0,
            }],
        )
        .unwrap();
        assert!(downturn.capital.cet1 < baseline.capital.cet1);
        assert!(downturn.risk_metrics.cet1_ratio < baseline.risk_metrics.cet1_ratio);
    }

    #[test]
    fn idiosyncratic_run_reduces_deposits_and_lcr() {
        let config = Config::default();
        let state = reference_state();
        let (baseline, _) = step(&state, &config, &[], &[]).unwrap();
        let (run, _) = step(&state, &config, &[], &[Shock::IdiosyncraticRun { multiplier: 1.5 }]).unwrap();

        let baseline_retail = baseline.balance_sheet.get(ProductType::RetailDeposits).unwrap().balance;
        let run_retail = run.balance_sheet.get(ProductType::RetailDeposits).unwrap().balance;
        assert!(run_retail < baseline_retail);
        assert!(run.risk_metrics.lcr < baseline.risk_metrics.lcr);
    }

    #[test]
    fn repo_borrow_increases_cash_and_encumbrance() {
        let config = Config::default();
        let state = reference_state();
        let before_cash = state.cash_balance();
        let before_gilts = state.balance_sheet.get(ProductType::Gilts).unwrap();
        let before_encumbered = before_gilts.encumbered;

        let (after, _) = step(
            &state,
            &config,
            &[PlayerAction::EnterRepo {
                direction: crate::actions::RepoDirection::Borrow,
                collateral_product: ProductType::Gilts,
                amount: 5e9,
                haircut: None,
                rate: Some(0.03),
            }],
            &[],
        )
        .unwrap();

        let repo = after.balance_sheet.get(ProductType::RepurchaseAgreements).unwrap();
        assert!(repo.balance >= 5e9 - 1.0);
        assert!(after.cash_balance() > before_cash);
        let after_gilts = after.balance_sheet.get(ProductType::Gilts).unwrap();
        assert!(after_gilts.encumbered > before_encumbered);

        let assets = after.balance_sheet.total_assets();
        let liabilities = after.balance_sheet.total_liabilities();
        let equity = after.capital.cet1 + after.capital.at1;
        assert!((assets - (liabilities + equity)).abs() <= 1.0);
    }

    #[test]
    fn counterparty_default_reduces_corporate_loans_by_expected_band() {
        let config = Config::default();
        let state = reference_state();
        let (baseline, _) = step(&state, &config, &[], &[]).unwrap();
        let (hit, _) = step(
            &state,
            &config,
            &[],
            &[Shock::CounterpartyDefault {
                product: ProductType::CorporateLoans,
                loss_amount: 10e9,
            }],
        )
        .unwrap();

        let baseline_balance = baseline.balance_sheet.get(ProductType::CorporateLoans).unwrap().balance;
        let hit_balance = hit.balance_sheet.get(ProductType::CorporateLoans).unwrap().balance;
        let reduction = baseline_balance - hit_balance;
        assert!(reduction >= 8e9 && reduction <= 12e9, "reduction was {reduction}");
    }
}
