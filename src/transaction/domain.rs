//! Core transaction domain types.

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{amount::Amount, category::CategoryId, period::PeriodId};

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// Whether a transaction spent money or brought money in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    /// Interpret a stored or submitted kind.
    ///
    /// Only the exact string `"income"` is income. Anything else, including a
    /// missing value, is an expense.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("income") => TransactionKind::Income,
            _ => TransactionKind::Expense,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "Expense",
            TransactionKind::Income => "Income",
        }
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = match value {
            ValueRef::Text(text) => std::str::from_utf8(text).ok(),
            _ => None,
        };

        Ok(TransactionKind::from_raw(raw))
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// Money spent or earned within one month's budget.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    /// The month's budget this transaction counts against.
    pub period_id: PeriodId,
    /// Display only, never used in budget calculations.
    pub category_id: Option<CategoryId>,
    pub amount: Amount,
    pub kind: TransactionKind,
    pub note: String,
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Start building a new transaction for the month `period_id`.
    ///
    /// `amount` is validated when the transaction is saved with
    /// [crate::transaction::create_transaction].
    pub fn build(period_id: PeriodId, amount: f64) -> NewTransaction {
        NewTransaction {
            period_id,
            amount,
            kind: TransactionKind::Expense,
            category_id: None,
            note: String::new(),
        }
    }

    /// The amount this transaction adds to the month's spending.
    ///
    /// Expenses count as positive spending, income as negative spending.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Expense => self.amount.as_f64(),
            TransactionKind::Income => -self.amount.as_f64(),
        }
    }
}

/// A transaction that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub period_id: PeriodId,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category_id: Option<CategoryId>,
    pub note: String,
}

impl NewTransaction {
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn note(mut self, note: &str) -> Self {
        self.note = note.trim().to_owned();
        self
    }
}

/// Form data for adding a transaction.
///
/// Every field arrives as text so that invalid input can be reported back to
/// the user instead of being rejected by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFormData {
    pub month: String,
    pub amount: String,
    pub kind: Option<String>,
    pub category_id: Option<String>,
    pub note: Option<String>,
}
