//! Balance-sheet line items and their liquidity tagging.

use serde::{Deserialize, Serialize};

use crate::product::ProductType;

/// HQLA tier for liquidity coverage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HqlaLevel {
    Level1,
    Level2A,
    Level2B,
    None,
}

impl HqlaLevel {
    /// Haircut-adjusted HQLA contribution factor.
    pub fn factor(self) -> f64 {
        match self {
            HqlaLevel::Level1 => 1.0,
            HqlaLevel::Level2A => 0.85,
            HqlaLevel::Level2B => 0.5,
            HqlaLevel::None => 0.0,
        }
    }
}

/// Liquidity metadata attached to a balance-sheet line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LiquidityTag {
    pub hqla_level: HqlaLevel,
    pub lcr_outflow_rate: Option<f64>,
    pub lcr_inflow_rate: Option<f64>,
    pub nsfr_asf_factor: Option<f64>,
    pub nsfr_rsf_factor: Option<f64>,
}

impl Default for LiquidityTag {
    fn default() -> Self {
        Self {
            hqla_level: HqlaLevel::None,
            lcr_outflow_rate: None,
            lcr_inflow_rate: None,
            nsfr_asf_factor: None,
            nsfr_rsf_factor: None,
        }
    }
}

/// A single balance-sheet line for one product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceSheetItem {
    pub balance: f64,
    pub interest_rate: f64,
    /// Maturity bucket tag only; carries no computation semantics.
    pub maturity_bucket: MaturityBucket,
    pub encumbered: f64,
    pub liquidity: LiquidityTag,
}

/// Coarse maturity bucket, carried as a tag only (§3: "tag only").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaturityBucket {
    Overnight,
    UpTo1Month,
    UpTo3Months,
    UpTo1Year,
    UpTo5Years,
    Over5Years,
}

impl BalanceSheetItem {
    pub fn new(balance: f64, interest_rate: f64, liquidity: LiquidityTag) -> Self {
        Self {
            balance: balance.max(0.0),
            interest_rate: interest_rate.max(0.0),
            maturity_bucket: MaturityBucket::UpTo1Year,
            encumbered: 0.0,
            liquidity,
        }
    }

    /// Portion of the balance not pledged as collateral.
    pub fn unencumbered(&self) -> f64 {
        (self.balance - self.encumbered).max(0.0)
    }
}

/// The full balance sheet: one optional line per product, preserving
/// insertion order (the step pipeline's floating-point results depend on
/// iteration order being stable across clones). Backed by a `Vec` rather
/// than a `BTreeMap`/`HashMap` because both would reorder by key instead of
/// by insertion, which the spec calls out as load-bearing for determinism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    entries: Vec<(ProductType, BalanceSheetItem)>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, product: ProductType) -> Option<&BalanceSheetItem> {
        self.entries
            .iter()
            .find(|(p, _)| *p == product)
            .map(|(_, item)| item)
    }

    pub fn get_mut(&mut self, product: ProductType) -> Option<&mut BalanceSheetItem> {
        self.entries
            .iter_mut()
            .find(|(p, _)| *p == product)
            .map(|(_, item)| item)
    }

    pub fn contains(&self, product: ProductType) -> bool {
        self.get(product).is_some()
    }

    /// Insert a line if absent, otherwise leave the existing one untouched.
    /// Returns a mutable reference either way.
    pub fn entry_or_insert(
        &mut self,
        product: ProductType,
        default: impl FnOnce() -> BalanceSheetItem,
    ) -> &mut BalanceSheetItem {
        if !self.contains(product) {
            self.entries.push((product, default()));
        }
        self.get_mut(product).expect("just inserted")
    }

    pub fn set(&mut self, product: ProductType, item: BalanceSheetItem) {
        if let Some(slot) = self.get_mut(product) {
            *slot = item;
        } else {
            self.entries.push((product, item));
        }
    }

    /// Iterate in insertion order, the order every behavioural/statement
    /// pass must preserve.
    pub fn iter(&self) -> impl Iterator<Item = (ProductType, &BalanceSheetItem)> {
        self.entries.iter().map(|(p, item)| (*p, item))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ProductType, &mut BalanceSheetItem)> {
        self.entries.iter_mut().map(|(p, item)| (*p, item))
    }

    pub fn cash_balance(&self) -> f64 {
        self.get(ProductType::CashReserves)
            .map(|i| i.balance)
            .unwrap_or(0.0)
    }

    pub fn total_assets(&self) -> f64 {
        self.iter()
            .filter(|(p, _)| p.side() == crate::product::Side::Asset)
            .map(|(_, i)| i.balance)
            .sum()
    }

    pub fn total_liabilities(&self) -> f64 {
        self.iter()
            .filter(|(p, _)| p.side() == crate::product::Side::Liability)
            .map(|(_, i)| i.balance)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut sheet = BalanceSheet::new();
        sheet.set(
            ProductType::Gilts,
            BalanceSheetItem::new(100.0, 0.01, LiquidityTag::default()),
        );
        sheet.set(
            ProductType::CashReserves,
            BalanceSheetItem::new(50.0, 0.0, LiquidityTag::default()),
        );
        let order: Vec<_> = sheet.iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![ProductType::Gilts, ProductType::CashReserves]);
    }

    #[test]
    fn unencumbered_floors_at_zero() {
        let mut item = BalanceSheetItem::new(100.0, 0.0, LiquidityTag::default());
        item.encumbered = 150.0;
        assert_eq!(item.unencumbered(), 0.0);
    }
}
