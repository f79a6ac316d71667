//! Creates the application's tables.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    category::{create_category_limit_table, create_category_table},
    period::create_period_table,
    transaction::create_transaction_table,
    user::create_user_table,
};

/// Enable foreign keys and create any missing tables.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
///
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction, so it must come first.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_period_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_category_limit_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Turn free text into a `LIKE` pattern that matches it as a substring.
///
/// `%`, `_` and `\` are escaped with `\`, so queries using the pattern need
/// `ESCAPE '\'`.
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');

    for character in search.trim().chars() {
        if matches!(character, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(character);
    }

    pattern.push('%');
    pattern
}
