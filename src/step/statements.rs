//! Step 12: build the cash-flow statement from balance-sheet deltas and the
//! P&L-driven operating cash delta computed in step 10.

use crate::config::Tolerances;
use crate::events::Event;
use crate::product::{ProductType, Side};
use crate::state::{BankState, CashFlowStatement};

#[allow(clippy::too_many_arguments)]
pub fn build_cash_flow_statement(
    input: &BankState,
    next: &mut BankState,
    cash_start: f64,
    operating_cash_delta: f64,
    net_income: f64,
    non_cash_losses: &[(ProductType, f64)],
    tolerances: &Tolerances,
    events: &mut Vec<Event>,
) -> CashFlowStatement {
    let cash_end = next.cash_balance();
    let net_change = cash_end - cash_start;

    let mut operating_balance_flow = 0.0;
    let mut investing_balance_flow = 0.0;
    let mut financing_balance_flow = 0.0;

    for product in ProductType::ALL {
        if product == ProductType::CashReserves {
            continue;
        }
        let previous = input.balance_sheet.get(product).map(|i| i.balance).unwrap_or(0.0);
        let current = next.balance_sheet.get(product).map(|i| i.balance).unwrap_or(0.0);
        let delta = current - previous;

        let flow = if product.side() == Side::Asset {
            let loss = non_cash_losses
                .iter()
                .find(|(p, _)| *p == product)
                .map(|(_, l)| *l)
                .unwrap_or(0.0);
            -delta + loss
        } else {
            delta
        };

        match product {
            ProductType::Gilts => investing_balance_flow += flow,
            ProductType::WholesaleFundingLT => financing_balance_flow += flow,
            _ => operating_balance_flow += flow,
        }
    }

    let external_capital_flow =
        (next.capital.cet1 + next.capital.at1) - (input.capital.cet1 + input.capital.at1) - net_income;
    financing_balance_flow += external_capital_flow;

    let mut operating_cash_flow = operating_cash_delta + operating_balance_flow;
    let investing_cash_flow = investing_balance_flow;
    let financing_cash_flow = financing_balance_flow;

    let mut mismatch = net_change - (operating_cash_flow + investing_cash_flow + financing_cash_flow);
    if mismatch.abs() <= tolerances.cash_flow_rounding_tolerance {
        operating_cash_flow += mismatch;
        mismatch = 0.0;
    }
    if mismatch.abs() > tolerances.cash_flow_breach_threshold {
        events.push(Event::error(format!(
            "cash-flow statement does not tie out: mismatch {mismatch:.4} exceeds breach threshold {:.4}",
            tolerances.cash_flow_breach_threshold
        )));
        next.status.flag_failure();
    }

    CashFlowStatement {
        cash_start,
        cash_end,
        net_change,
        operating: operating_cash_flow,
        investing: investing_cash_flow,
        financing: financing_cash_flow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};

    #[test]
    fn pure_capital_injection_ties_out_as_financing() {
        let input = BankState::default();
        let mut next = BankState::default();
        next.capital.cet1 = 100.0;
        next.balance_sheet.set(
            ProductType::CashReserves,
            BalanceSheetItem::new(100.0, 0.0, LiquidityTag::default()),
        );
        let mut events = Vec::new();
        let statement = build_cash_flow_statement(
            &input,
            &mut next,
            0.0,
            0.0,
            0.0,
            &[],
            &Tolerances::default(),
            &mut events,
        );
        assert!((statement.financing - 100.0).abs() < 1e-6);
        assert!(events.is_empty());
        assert!((statement.operating + statement.investing + statement.financing - statement.net_change).abs() < 1e-6);
    }

    #[test]
    fn sub_tolerance_residual_is_absorbed_into_operating_and_still_ties_out() {
        let input = BankState::default();
        let mut next = BankState::default();
        next.balance_sheet.set(
            ProductType::CashReserves,
            BalanceSheetItem::new(10.0, 0.0, LiquidityTag::default()),
        );
        let mut events = Vec::new();
        // operating_cash_delta is deliberately off by a sub-tolerance residual
        // (9.999 vs. the 10.0 actually landing in cash) to exercise absorption.
        let statement = build_cash_flow_statement(
            &input,
            &mut next,
            0.0,
            9.999,
            0.0,
            &[],
            &Tolerances::default(),
            &mut events,
        );
        assert!(events.is_empty());
        assert!((statement.operating - 10.0).abs() < 1e-9);
        assert!((statement.operating + statement.investing + statement.financing - statement.net_change).abs() < 1e-9);
    }
}
