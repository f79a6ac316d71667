//! Transactions recorded against a month's budget.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `NewTransaction` builder
//! - Database functions for storing, searching and totalling transactions
//! - The transactions page and the endpoints for adding and deleting transactions

mod create_endpoint;
mod db;
mod delete_endpoint;
mod domain;
mod query;
mod transactions_page;

pub use create_endpoint::{CreateTransactionState, create_transaction_endpoint};
pub use db::{
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    list_transactions,
};
pub use delete_endpoint::{DeleteTransactionState, delete_transaction_endpoint};
pub use domain::{NewTransaction, Transaction, TransactionFormData, TransactionId, TransactionKind};
pub use query::{
    SortOrder, TransactionRow, count_search_transactions, count_transactions_in_month,
    search_transactions, total_spent_by_month,
};
pub use transactions_page::{TransactionsQuery, TransactionsViewState, get_transactions_page};
