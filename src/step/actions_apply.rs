//! Step 4: apply player actions in input order.

use crate::actions::{PlayerAction, RepoDirection};
use crate::balance_sheet::{BalanceSheetItem, LiquidityTag};
use crate::cohort;
use crate::config::Config;
use crate::error::EngineError;
use crate::events::Event;
use crate::product::ProductType;
use crate::state::BankState;

fn blend_rate(item: &mut BalanceSheetItem, added_amount: f64, added_rate: f64) {
    let old_balance = item.balance;
    let new_balance = old_balance + added_amount;
    item.interest_rate = if new_balance > 0.0 {
        (item.interest_rate * old_balance + added_rate * added_amount) / new_balance
    } else {
        added_rate
    };
}

pub fn apply_actions(
    next: &mut BankState,
    config: &Config,
    actions: &[PlayerAction],
    events: &mut Vec<Event>,
) -> Result<(), EngineError> {
    for action in actions {
        match action {
            PlayerAction::AdjustRate { product, rate } => {
                next.balance_sheet
                    .entry_or_insert(*product, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
                    .interest_rate = *rate;
            }
            PlayerAction::IssueEquity { amount } => {
                next.capital.cet1 += amount;
                next.balance_sheet
                    .entry_or_insert(ProductType::CashReserves, || {
                        BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default())
                    })
                    .balance += amount;
            }
            PlayerAction::IssueDebt { product, amount, rate } => {
                apply_issue_debt(next, *product, *amount, *rate);
            }
            PlayerAction::BuySellAsset { product, delta } => {
                apply_buy_sell_asset(next, config, *product, *delta, events)?;
            }
            PlayerAction::EnterRepo {
                direction,
                collateral_product,
                amount,
                haircut,
                rate,
            } => {
                apply_enter_repo(next, *direction, *collateral_product, *amount, *haircut, *rate);
            }
        }
    }
    Ok(())
}

fn apply_issue_debt(next: &mut BankState, product: ProductType, amount: f64, rate: Option<f64>) {
    let pricing_rate = rate.unwrap_or_else(|| match product {
        ProductType::WholesaleFundingST => next.market.base_rate + next.market.spreads.wholesale,
        ProductType::WholesaleFundingLT => next.market.risk_free_long + next.market.spreads.senior_debt,
        _ => next.market.base_rate,
    });

    let item = next
        .balance_sheet
        .entry_or_insert(product, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()));
    blend_rate(item, amount, pricing_rate);
    item.balance += amount;

    next.balance_sheet
        .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
        .balance += amount;
}

fn apply_buy_sell_asset(
    next: &mut BankState,
    config: &Config,
    product: ProductType,
    delta: f64,
    events: &mut Vec<Event>,
) -> Result<(), EngineError> {
    if product.is_loan() {
        if delta > 0.0 {
            let item = next.balance_sheet.get(product);
            let rate = item.map(|i| i.interest_rate).unwrap_or(0.0);
            let params = config.product_parameters(product);
            cohort::originate(
                &mut next.cohorts,
                &mut next.balance_sheet,
                config,
                product,
                next.clock.step as i64,
                delta,
                rate,
                None,
                params.base_default_rate,
                params.loss_given_default,
            )?;
        } else if delta < 0.0 {
            cohort::prepay(&mut next.cohorts, &mut next.balance_sheet, product, -delta);
        }
        return Ok(());
    }

    if delta > 0.0 {
        let cash_available = next.balance_sheet.cash_balance();
        let bought = delta.min(cash_available.max(0.0));
        if bought + 1e-9 < delta {
            events.push(Event::info(format!(
                "buy of {product:?} truncated to available cash: requested {delta:.2}, funded {bought:.2}"
            )));
        }
        next.balance_sheet
            .entry_or_insert(product, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
            .balance += bought;
        next.balance_sheet
            .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
            .balance -= bought;
    } else if delta < 0.0 {
        let requested = -delta;
        let current = next.balance_sheet.get(product).map(|i| i.balance).unwrap_or(0.0);
        let sold = requested.min(current);
        if let Some(item) = next.balance_sheet.get_mut(product) {
            item.balance -= sold;
        }
        next.balance_sheet
            .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
            .balance += sold;
    }
    Ok(())
}

fn apply_enter_repo(
    next: &mut BankState,
    direction: RepoDirection,
    collateral_product: ProductType,
    amount: f64,
    haircut: Option<f64>,
    rate: Option<f64>,
) {
    match direction {
        RepoDirection::Borrow => {
            let hc = haircut.unwrap_or(0.0).max(0.0);
            let req = 1.0 + hc;
            let (available, _) = next
                .balance_sheet
                .get(collateral_product)
                .map(|i| (i.balance - i.encumbered, i.balance))
                .unwrap_or((0.0, 0.0));
            let max_borrow = if req > 0.0 { available / req } else { 0.0 };
            let borrow = amount.min(max_borrow.max(0.0));
            if borrow <= 0.0 {
                return;
            }
            let pricing_rate = rate.unwrap_or(next.market.base_rate + next.market.repo_haircuts.gilt);

            let item = next.balance_sheet.entry_or_insert(ProductType::RepurchaseAgreements, || {
                BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default())
            });
            blend_rate(item, borrow, pricing_rate);
            item.balance += borrow;

            next.balance_sheet
                .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
                .balance += borrow;

            if let Some(collateral) = next.balance_sheet.get_mut(collateral_product) {
                collateral.encumbered = (collateral.encumbered + borrow * req).min(collateral.balance);
            }
        }
        RepoDirection::Lend => {
            let cash_available = next.balance_sheet.cash_balance();
            let lend = amount.min(cash_available.max(0.0));
            if lend <= 0.0 {
                return;
            }
            let pricing_rate = rate.unwrap_or(next.market.base_rate);

            let item = next.balance_sheet.entry_or_insert(ProductType::ReverseRepo, || {
                BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default())
            });
            blend_rate(item, lend, pricing_rate);
            item.balance += lend;

            next.balance_sheet
                .entry_or_insert(ProductType::CashReserves, || BalanceSheetItem::new(0.0, 0.0, LiquidityTag::default()))
                .balance -= lend;
        }
    }
}
