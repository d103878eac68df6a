//! Chart of accounts
//!
//! The settlement books use a small, fixed chart. Accounts are addressed by
//! a stable [`AccountCode`]; callers outside the crate may pass the code as a
//! string (`"2000"`), which parses to the enum or is rejected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Currency, Money};
use crate::error::LedgerError;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// Stable codes of the settlement chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountCode {
    #[serde(rename = "1000")]
    Cash,
    #[serde(rename = "1200")]
    InputTaxReceivable,
    #[serde(rename = "2000")]
    AccountsPayable,
    #[serde(rename = "2100")]
    WithholdingTaxPayable,
    #[serde(rename = "2200")]
    AccruedLiabilities,
    #[serde(rename = "3000")]
    RetainedEarnings,
    #[serde(rename = "4100")]
    PurchaseDiscounts,
    #[serde(rename = "5000")]
    PurchasesExpense,
}

impl AccountCode {
    /// Every code in the chart, in code order
    pub const ALL: [AccountCode; 8] = [
        AccountCode::Cash,
        AccountCode::InputTaxReceivable,
        AccountCode::AccountsPayable,
        AccountCode::WithholdingTaxPayable,
        AccountCode::AccruedLiabilities,
        AccountCode::RetainedEarnings,
        AccountCode::PurchaseDiscounts,
        AccountCode::PurchasesExpense,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            AccountCode::Cash => "1000",
            AccountCode::InputTaxReceivable => "1200",
            AccountCode::AccountsPayable => "2000",
            AccountCode::WithholdingTaxPayable => "2100",
            AccountCode::AccruedLiabilities => "2200",
            AccountCode::RetainedEarnings => "3000",
            AccountCode::PurchaseDiscounts => "4100",
            AccountCode::PurchasesExpense => "5000",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccountCode::Cash => "Cash",
            AccountCode::InputTaxReceivable => "Input Tax Receivable",
            AccountCode::AccountsPayable => "Accounts Payable",
            AccountCode::WithholdingTaxPayable => "Withholding Tax Payable",
            AccountCode::AccruedLiabilities => "Accrued Liabilities",
            AccountCode::RetainedEarnings => "Retained Earnings",
            AccountCode::PurchaseDiscounts => "Purchase Discounts",
            AccountCode::PurchasesExpense => "Purchases Expense",
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            AccountCode::Cash | AccountCode::InputTaxReceivable => AccountType::Asset,
            AccountCode::AccountsPayable
            | AccountCode::WithholdingTaxPayable
            | AccountCode::AccruedLiabilities => AccountType::Liability,
            AccountCode::RetainedEarnings => AccountType::Equity,
            AccountCode::PurchaseDiscounts => AccountType::Revenue,
            AccountCode::PurchasesExpense => AccountType::Expense,
        }
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AccountCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AccountCode::ALL
            .iter()
            .copied()
            .find(|code| code.code() == trimmed)
            .ok_or_else(|| LedgerError::UnknownAccount(trimmed.to_string()))
    }
}

/// An account in the chart of accounts
///
/// `balance` is the signed sum of `debit - credit` over every posting that
/// references the account. Only the journal engine changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Account code (e.g., "2000")
    pub code: AccountCode,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Running balance
    pub balance: Money,
    /// Seeded by the system and not user-editable
    pub is_system: bool,
    /// When the account was seeded
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a zero-balance system account for a chart code
    pub fn seeded(code: AccountCode, currency: Currency) -> Self {
        Self {
            id: AccountId::new_v7(),
            code,
            name: code.name().to_string(),
            account_type: code.account_type(),
            balance: Money::zero(currency),
            is_system: true,
            created_at: Utc::now(),
        }
    }

    /// Balance expressed on the account's normal side
    ///
    /// A liability with `balance = -500` (net credit) has a normal balance of 500.
    pub fn normal_balance(&self) -> Money {
        if self.account_type.is_debit_normal() {
            self.balance
        } else {
            self.balance.negated()
        }
    }
}

/// Standard chart of accounts for procurement settlement
pub struct ChartOfAccounts;

impl ChartOfAccounts {
    /// Creates the standard accounts, all at zero balance
    pub fn standard(currency: Currency) -> Vec<Account> {
        AccountCode::ALL
            .iter()
            .map(|code| Account::seeded(*code, currency))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_code_round_trip() {
        for code in AccountCode::ALL {
            assert_eq!(code.code().parse::<AccountCode>().unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!(matches!(
            "9999".parse::<AccountCode>(),
            Err(LedgerError::UnknownAccount(code)) if code == "9999"
        ));
    }

    #[test]
    fn test_serde_uses_numeric_code() {
        let json = serde_json::to_string(&AccountCode::AccountsPayable).unwrap();
        assert_eq!(json, "\"2000\"");
    }

    #[test]
    fn test_standard_chart() {
        let chart = ChartOfAccounts::standard(Currency::USD);
        assert_eq!(chart.len(), 8);
        assert!(chart.iter().all(|a| a.is_system && a.balance.is_zero()));
    }

    #[test]
    fn test_normal_balance_of_liability() {
        let mut ap = Account::seeded(AccountCode::AccountsPayable, Currency::USD);
        ap.balance = Money::new(dec!(-500), Currency::USD);
        assert_eq!(ap.normal_balance().amount(), dec!(500));
    }

    #[test]
    fn test_normal_balance_of_asset_is_unchanged() {
        let mut cash = Account::seeded(AccountCode::Cash, Currency::USD);
        cash.balance = Money::new(dec!(-1200), Currency::USD);
        assert_eq!(cash.normal_balance().amount(), dec!(-1200));
    }
}
