//! Step 3: fold shocks into a [`ShockContext`], applying the shocks that
//! have direct balance-sheet effects (`idiosyncraticRun`) immediately.

use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};
use crate::config::Config;
use crate::events::Event;
use crate::product::ProductType;
use crate::shocks::{Shock, ShockContext};
use crate::state::BankState;

pub fn apply_shocks(
    next: &mut BankState,
    config: &Config,
    shocks: &[Shock],
    events: &mut Vec<Event>,
) -> ShockContext {
    let mut ctx = ShockContext::default();

    for shock in shocks {
        match shock {
            Shock::DepositCompetition {
                retail_rate_increase,
                corporate_rate_increase,
            } => {
                next.market.competitor_rates.retail_deposit += retail_rate_increase;
                if let Some(increase) = corporate_rate_increase {
                    next.market.competitor_rates.corporate_deposit =
                        Some(next.market.competitor_rates.corporate_deposit.unwrap_or(
                            next.market.competitor_rates.retail_deposit,
                        ) + increase);
                }
            }
            Shock::MarketSpreadShock {
                bps,
                corporate_loan_bps,
                haircut_increase_pct,
            } => {
                let delta = bps / 10_000.0;
                next.market.spreads.wholesale += delta;
                next.market.spreads.senior_debt += delta;
                next.market.spreads.credit += delta;
                next.market.spreads.corporate_loan += corporate_loan_bps / 10_000.0;
                next.market.repo_haircuts.gilt += haircut_increase_pct;
            }
            Shock::IdiosyncraticRun { multiplier } => {
                ctx.lcr_outflow_multiplier *= multiplier;
                apply_idiosyncratic_run(next, config, ctx.lcr_outflow_multiplier, events);
            }
            Shock::MacroDownturn { pd_mult, lgd_mult } => {
                ctx.pd_multiplier *= pd_mult;
                ctx.lgd_multiplier *= lgd_mult;
            }
            Shock::CounterpartyDefault { product, loss_amount } => {
                ctx.add_extra_loss(*product, *loss_amount);
            }
        }
    }

    ctx
}

fn apply_idiosyncratic_run(next: &mut BankState, config: &Config, outflow_mult: f64, events: &mut Vec<Event>) {
    let params = config.shock_parameters.idiosyncratic_run;
    let run_off = (params.base_run_off_rate + (outflow_mult - 1.0).max(0.0) * params.incremental_rate)
        .min(params.max_run_off_rate);

    let retail_balance = next
        .balance_sheet
        .get(ProductType::RetailDeposits)
        .map(|i| i.balance)
        .unwrap_or(0.0);
    let corporate_balance = next
        .balance_sheet
        .get(ProductType::CorporateDeposits)
        .map(|i| i.balance)
        .unwrap_or(0.0);

    let retail_requested = retail_balance * run_off;
    let corporate_requested = corporate_balance * run_off;
    let combined_requested = retail_requested + corporate_requested;
    if combined_requested <= 0.0 {
        return;
    }

    let cash = next
        .balance_sheet
        .entry_or_insert(ProductType::CashReserves, || {
            BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default())
        });
    let paid = combined_requested.min(cash.balance);
    cash.balance -= paid;

    let paid_retail = retail_requested.min(paid);
    let paid_corporate = corporate_requested.min(paid - paid_retail);

    if let Some(item) = next.balance_sheet.get_mut(ProductType::RetailDeposits) {
        item.balance -= paid_retail;
    }
    if let Some(item) = next.balance_sheet.get_mut(ProductType::CorporateDeposits) {
        item.balance -= paid_corporate;
    }

    if paid + 1e-9 < combined_requested {
        let shortfall = combined_requested - paid;
        events.push(Event::error(format!(
            "idiosyncratic run outflow shortfall of {shortfall:.2}: requested {combined_requested:.2}, available {paid:.2}"
        )));
        next.status.flag_failure();
    }
}
