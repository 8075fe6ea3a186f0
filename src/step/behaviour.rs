//! Steps 5 and 6: deposit and loan behavioural flows.

use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};
use crate::cohort;
use crate::config::Config;
use crate::error::EngineError;
use crate::events::Event;
use crate::product::ProductType;
use crate::state::BankState;

fn growth_factor(g: f64, dt_months: f64) -> f64 {
    (1.0 + g * dt_months).max(0.0)
}

/// Step 5: grow or shrink each customer-deposit product toward its
/// elasticity-implied desired balance.
pub fn apply_deposit_behaviour(next: &mut BankState, config: &Config, dt_months: f64, events: &mut Vec<Event>) {
    for product in [ProductType::RetailDeposits, ProductType::CorporateDeposits] {
        let own_rate = next.balance_sheet.get(product).map(|i| i.interest_rate).unwrap_or(0.0);
        let balance = next.balance_sheet.get(product).map(|i| i.balance).unwrap_or(0.0);
        let competitor_rate = match product {
            ProductType::RetailDeposits => next.market.competitor_rates.retail_deposit,
            ProductType::CorporateDeposits => next
                .market
                .competitor_rates
                .corporate_deposit
                .unwrap_or(next.market.competitor_rates.retail_deposit),
            _ => unreachable!(),
        };
        let elasticity = config.product_parameters(product).volume_elasticity_to_rate;
        let g = (config.behaviour.deposit_baseline_growth_monthly + elasticity * (own_rate - competitor_rate))
            .clamp(config.behaviour.min_deposit_growth_per_step, config.global.max_deposit_growth_per_step);
        let desired = balance * growth_factor(g, dt_months);
        let delta = desired - balance;

        if delta >= 0.0 {
            next.balance_sheet
                .entry_or_insert(product, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
                .balance = desired;
            next.balance_sheet
                .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
                .balance += delta;
        } else {
            let requested = -delta;
            let cash = next
                .balance_sheet
                .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()));
            let paid = requested.min(cash.balance);
            cash.balance -= paid;
            if let Some(item) = next.balance_sheet.get_mut(product) {
                item.balance -= paid;
            }
            if paid + 1e-9 < requested {
                events.push(Event::error(format!(
                    "{product:?} outflow shortfall: requested {requested:.2}, available {paid:.2}"
                )));
                next.status.flag_failure();
            }
        }
    }
}

/// Step 6: grow or shrink each loan product toward its elasticity-implied
/// desired balance via origination/prepayment.
pub fn apply_loan_behaviour(
    next: &mut BankState,
    config: &Config,
    dt_months: f64,
    events: &mut Vec<Event>,
) -> Result<(), EngineError> {
    for product in [ProductType::Mortgages, ProductType::CorporateLoans] {
        let own_rate = next.balance_sheet.get(product).map(|i| i.interest_rate).unwrap_or(0.0);
        let balance = next.balance_sheet.get(product).map(|i| i.balance).unwrap_or(0.0);
        let benchmark_rate = match product {
            ProductType::Mortgages => next.market.competitor_rates.mortgage,
            ProductType::CorporateLoans => next.market.risk_free_long + next.market.spreads.corporate_loan,
            _ => unreachable!(),
        };
        let params = config.product_parameters(product);
        let g = (config.behaviour.loan_baseline_growth_monthly + params.volume_elasticity_to_rate * (own_rate - benchmark_rate))
            .clamp(config.behaviour.min_loan_growth_per_step, config.global.max_loan_growth_per_step);
        let desired = balance * growth_factor(g, dt_months);
        let delta = desired - balance;

        if delta > 0.0 {
            let _ = cohort::originate(
                &mut next.cohorts,
                &mut next.balance_sheet,
                config,
                product,
                next.clock.step as i64,
                delta,
                own_rate,
                None,
                params.base_default_rate,
                params.loss_given_default,
            )
            .unwrap_or_else(|err| {
                events.push(Event::warning(format!("loan behaviour origination skipped: {err}")));
                0.0
            });
        } else if delta < 0.0 {
            cohort::prepay(&mut next.cohorts, &mut next.balance_sheet, product, -delta);
        }
    }
    Ok(())
}
