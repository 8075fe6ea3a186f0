//! Product taxonomy and fixed per-product behaviour metadata.

use serde::{Deserialize, Serialize};

/// Balance sheet side a product sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Asset,
    Liability,
}

/// Deposit segmentation used by the behavioural deposit model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositSegment {
    Retail,
    Corporate,
}

/// Loan pricing benchmark used by the behavioural loan model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanBenchmark {
    Mortgage,
    Corporate,
}

/// Closed enumeration of every balance-sheet line the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    // Assets
    CashReserves,
    Gilts,
    Mortgages,
    CorporateLoans,
    ReverseRepo,
    // Liabilities
    RetailDeposits,
    CorporateDeposits,
    WholesaleFundingST,
    WholesaleFundingLT,
    RepurchaseAgreements,
}

impl ProductType {
    /// Every product, in a fixed, stable iteration order. Several pipeline
    /// stages (behavioural updates, cohort stepping, statement building)
    /// must dispatch in this order for determinism.
    pub const ALL: [ProductType; 10] = [
        ProductType::CashReserves,
        ProductType::Gilts,
        ProductType::Mortgages,
        ProductType::CorporateLoans,
        ProductType::ReverseRepo,
        ProductType::RetailDeposits,
        ProductType::CorporateDeposits,
        ProductType::WholesaleFundingST,
        ProductType::WholesaleFundingLT,
        ProductType::RepurchaseAgreements,
    ];

    pub fn side(self) -> Side {
        match self {
            ProductType::CashReserves
            | ProductType::Gilts
            | ProductType::Mortgages
            | ProductType::CorporateLoans
            | ProductType::ReverseRepo => Side::Asset,
            ProductType::RetailDeposits
            | ProductType::CorporateDeposits
            | ProductType::WholesaleFundingST
            | ProductType::WholesaleFundingLT
            | ProductType::RepurchaseAgreements => Side::Liability,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProductType::CashReserves => "Cash & Reserves",
            ProductType::Gilts => "Gilts",
            ProductType::Mortgages => "Mortgages",
            ProductType::CorporateLoans => "Corporate Loans",
            ProductType::ReverseRepo => "Reverse Repo",
            ProductType::RetailDeposits => "Retail Deposits",
            ProductType::CorporateDeposits => "Corporate Deposits",
            ProductType::WholesaleFundingST => "Wholesale Funding (ST)",
            ProductType::WholesaleFundingLT => "Wholesale Funding (LT)",
            ProductType::RepurchaseAgreements => "Repurchase Agreements",
        }
    }

    pub fn is_loan(self) -> bool {
        matches!(self, ProductType::Mortgages | ProductType::CorporateLoans)
    }

    pub fn is_customer_deposit(self) -> bool {
        matches!(
            self,
            ProductType::RetailDeposits | ProductType::CorporateDeposits
        )
    }

    pub fn deposit_segment(self) -> Option<DepositSegment> {
        match self {
            ProductType::RetailDeposits => Some(DepositSegment::Retail),
            ProductType::CorporateDeposits => Some(DepositSegment::Corporate),
            _ => None,
        }
    }

    pub fn loan_benchmark(self) -> Option<LoanBenchmark> {
        match self {
            ProductType::Mortgages => Some(LoanBenchmark::Mortgage),
            ProductType::CorporateLoans => Some(LoanBenchmark::Corporate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_partitions_match_spec() {
        let assets = [
            ProductType::CashReserves,
            ProductType::Gilts,
            ProductType::Mortgages,
            ProductType::CorporateLoans,
            ProductType::ReverseRepo,
        ];
        let liabilities = [
            ProductType::RetailDeposits,
            ProductType::CorporateDeposits,
            ProductType::WholesaleFundingST,
            ProductType::WholesaleFundingLT,
            ProductType::RepurchaseAgreements,
        ];
        for p in assets {
            assert_eq!(p.side(), Side::Asset);
        }
        for p in liabilities {
            assert_eq!(p.side(), Side::Liability);
        }
    }

    #[test]
    fn only_mortgages_and_corp_loans_are_loans() {
        for p in ProductType::ALL {
            assert_eq!(p.is_loan(), matches!(p, ProductType::Mortgages | ProductType::CorporateLoans));
        }
    }
}
