//! Turns a month's budget and transactions into the figures shown to the user.
//!
//! Everything here is pure: the same inputs always give the same summary,
//! and malformed amounts count as zero instead of poisoning the totals.

use std::collections::BTreeMap;

use crate::{
    amount::Amount, category::CategoryId, period::PeriodId, transaction::Transaction,
};

/// Shown when a month's spending is more than its budget.
pub const OVER_BUDGET_WARNING: &str = "Spending has exceeded the budget!";

/// The derived totals for one month. Never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerSummary {
    pub total_budget: f64,
    /// Expenses minus income.
    pub total_spent: f64,
    /// `total_budget - total_spent`, negative when over budget.
    pub remaining: f64,
    pub is_over_budget: bool,
}

impl LedgerSummary {
    pub fn warning(&self) -> Option<&'static str> {
        self.is_over_budget.then_some(OVER_BUDGET_WARNING)
    }
}

/// Summarize the transactions belonging to `period_id` against `total_budget`.
///
/// A missing budget counts as zero. Transactions from other months are
/// ignored, so `transactions` does not need to be pre-filtered.
pub fn summarize(
    total_budget: Option<Amount>,
    transactions: &[Transaction],
    period_id: PeriodId,
) -> LedgerSummary {
    let total_budget = total_budget.unwrap_or(Amount::ZERO).as_f64();
    let total_spent = signed_total(transactions, period_id);
    let remaining = total_budget - total_spent;

    LedgerSummary {
        total_budget,
        total_spent,
        remaining,
        is_over_budget: remaining < 0.0,
    }
}

fn signed_total(transactions: &[Transaction], period_id: PeriodId) -> f64 {
    transactions
        .iter()
        .filter(|transaction| transaction.period_id == period_id)
        .map(Transaction::signed_amount)
        .filter(|amount| amount.is_finite())
        .sum()
}

/// Signed spending per category for one month, uncategorised spending under `None`.
///
/// Ordered by category ID with `None` first.
pub fn spending_by_category(
    transactions: &[Transaction],
    period_id: PeriodId,
) -> Vec<(Option<CategoryId>, f64)> {
    let mut totals: BTreeMap<Option<CategoryId>, f64> = BTreeMap::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.period_id == period_id)
    {
        *totals.entry(transaction.category_id).or_default() += transaction.signed_amount();
    }

    totals.into_iter().collect()
}
