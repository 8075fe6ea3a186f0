//! The bank state: composition of the balance sheet, loan cohorts, capital,
//! statements, risk metrics, market, behaviour and status (§3 BankState,
//! §4.7 State Clone).

use serde::{Deserialize, Serialize};

use crate::balance_sheet::BalanceSheet;
use crate::cohort::CohortBook;
use crate::market::MarketState;
use crate::risk::{Compliance, RiskMetrics};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapitalState {
    pub cet1: f64,
    pub at1: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub interest_income: f64,
    pub interest_expense: f64,
    pub net_interest_income: f64,
    pub fee_income: f64,
    pub credit_losses: f64,
    pub operating_expenses: f64,
    pub pre_tax_profit: f64,
    pub tax: f64,
    pub net_income: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub cash_start: f64,
    pub cash_end: f64,
    pub net_change: f64,
    pub operating: f64,
    pub investing: f64,
    pub financing: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BehaviouralState {
    pub deposit_franchise_strength: f64,
    pub reputation: f64,
    /// Currently informational only; no downstream consumer reads it.
    pub rating_notch_offset: i32,
}

impl Default for BehaviouralState {
    fn default() -> Self {
        Self {
            deposit_franchise_strength: 1.0,
            reputation: 1.0,
            rating_notch_offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Status {
    pub is_in_resolution: bool,
    pub has_failed: bool,
}

impl Status {
    /// `has_failed` is sticky: once set it is never cleared by the core.
    pub fn flag_failure(&mut self) {
        self.has_failed = true;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimClock {
    pub step: u64,
    /// Milliseconds since the Unix epoch.
    pub date_millis: i64,
    pub step_length_months: u32,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            step: 0,
            date_millis: 0,
            step_length_months: 1,
        }
    }
}

impl SimClock {
    /// Advance the clock by one step: `step += 1`, `date += stepLengthMonths
    /// * 30 * 86400 * 1000` ms (§4.5 step 12).
    pub fn advance(&mut self) {
        self.step += 1;
        self.date_millis += self.step_length_months as i64 * 30 * 86_400 * 1000;
    }
}

pub const ENGINE_VERSION: &str = "1.0";

/// The full bank state. Every entity is exclusively owned here; there is no
/// aliasing. A step takes a read-only `&BankState` and produces a fresh
/// owned one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankState {
    pub balance_sheet: BalanceSheet,
    pub cohorts: CohortBook,
    pub capital: CapitalState,
    pub income_statement: IncomeStatement,
    pub cash_flow_statement: CashFlowStatement,
    pub risk_metrics: RiskMetrics,
    pub compliance: Compliance,
    pub market: MarketState,
    pub behaviour: BehaviouralState,
    pub status: Status,
    pub clock: SimClock,
    pub version: String,
}

impl Default for BankState {
    fn default() -> Self {
        Self {
            balance_sheet: BalanceSheet::new(),
            cohorts: CohortBook::new(),
            capital: CapitalState::default(),
            income_statement: IncomeStatement::default(),
            cash_flow_statement: CashFlowStatement::default(),
            risk_metrics: RiskMetrics::default(),
            compliance: Compliance::default(),
            market: MarketState::default(),
            behaviour: BehaviouralState::default(),
            status: Status::default(),
            clock: SimClock::default(),
            version: ENGINE_VERSION.to_string(),
        }
    }
}

impl BankState {
    pub fn cash_balance(&self) -> f64 {
        self.balance_sheet.cash_balance()
    }

    /// Structural deep clone (§4.7): every map, list, and nested record is
    /// rebuilt, sharing no mutable state with `self`. Because every field
    /// in `BankState` is owned data (no `Rc`/`Arc`/interior mutability),
    /// the derived `Clone` impl already satisfies this; this method exists
    /// to name the operation the pipeline's first step performs.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}
