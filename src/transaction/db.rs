//! Database operations for transactions.

use rusqlite::{Connection, Row, ffi};
use time::OffsetDateTime;

use crate::{
    Error,
    amount::Amount,
    period::PeriodId,
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// Initialize the transaction table and indexes.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period_id INTEGER NOT NULL,
            category_id INTEGER,
            amount REAL NOT NULL,
            kind TEXT NOT NULL DEFAULT 'expense',
            note TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY(period_id) REFERENCES period(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_period ON \"transaction\"(period_id, created_at);",
    )?;

    Ok(())
}

/// Validate and save a new transaction.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not a finite, positive number.
///   Nothing is written in this case.
/// - [Error::InvalidCategory] if the category ID does not refer to a category.
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = Amount::new(new_transaction.amount)?;

    if amount == Amount::ZERO {
        return Err(Error::InvalidAmount(new_transaction.amount.to_string()));
    }

    connection
        .prepare(
            "INSERT INTO \"transaction\" (period_id, category_id, amount, kind, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, period_id, category_id, amount, kind, note, created_at",
        )?
        .query_row(
            (
                new_transaction.period_id,
                new_transaction.category_id,
                amount,
                new_transaction.kind,
                &new_transaction.note,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                ffi::Error {
                    code: _,
                    extended_code: ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) if new_transaction.category_id.is_some() => {
                Error::InvalidCategory(new_transaction.category_id)
            }
            error => error.into(),
        })
}

/// Retrieve a single transaction by ID.
pub fn get_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, period_id, category_id, amount, kind, note, created_at
            FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &transaction_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve every transaction recorded against `period_id`, oldest first.
pub fn list_transactions(
    period_id: PeriodId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, period_id, category_id, amount, kind, note, created_at
            FROM \"transaction\" WHERE period_id = :period_id
            ORDER BY created_at ASC, id ASC",
        )?
        .query_map(&[(":period_id", &period_id)], map_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Delete the transaction `transaction_id` if it belongs to `period_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingTransaction] if no such transaction exists in the period.
pub fn delete_transaction(
    transaction_id: TransactionId,
    period_id: PeriodId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND period_id = ?2",
        (transaction_id, period_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

pub(crate) fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        period_id: row.get(1)?,
        category_id: row.get(2)?,
        amount: row.get(3)?,
        kind: row.get(4)?,
        note: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod transaction_query_tests {
    use rusqlite::Connection;
    use time::Month;

    use crate::{
        Error,
        amount::Amount,
        category::{CategoryName, create_category},
        period::{MonthKey, PeriodBudget, get_or_create_period_budget},
        test_utils::{get_test_connection, insert_test_user},
        transaction::{
            Transaction, TransactionKind, create_transaction, delete_transaction, get_transaction,
            list_transactions,
        },
    };

    fn get_connection_with_period() -> (Connection, PeriodBudget) {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let period =
            get_or_create_period_budget(user.id, MonthKey::new(2025, Month::October), &connection)
                .expect("Could not create period");

        (connection, period)
    }

    #[test]
    fn create_transaction_succeeds() {
        let (connection, period) = get_connection_with_period();
        let category = create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();

        let transaction = create_transaction(
            Transaction::build(period.id, 12.5)
                .kind(TransactionKind::Income)
                .category_id(Some(category.id))
                .note("  lunch refund "),
            &connection,
        )
        .expect("Could not create transaction");

        assert!(transaction.id > 0);
        assert_eq!(transaction.period_id, period.id);
        assert_eq!(transaction.amount, Amount::coerce(12.5));
        assert_eq!(transaction.kind, TransactionKind::Income);
        assert_eq!(transaction.category_id, Some(category.id));
        assert_eq!(transaction.note, "lunch refund");
    }

    #[test]
    fn create_transaction_rejects_invalid_amounts_without_writing() {
        let (connection, period) = get_connection_with_period();

        for amount in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let result = create_transaction(Transaction::build(period.id, amount), &connection);

            assert!(
                matches!(result, Err(Error::InvalidAmount(_))),
                "expected {amount} to be rejected, got {result:?}"
            );
        }

        assert_eq!(list_transactions(period.id, &connection), Ok(vec![]));
    }

    #[test]
    fn create_transaction_with_unknown_category_fails() {
        let (connection, period) = get_connection_with_period();

        let result = create_transaction(
            Transaction::build(period.id, 5.0).category_id(Some(999)),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(999))));
    }

    #[test]
    fn list_transactions_only_returns_the_period() {
        let (connection, period) = get_connection_with_period();
        let other_period = get_or_create_period_budget(
            period.user_id,
            MonthKey::new(2025, Month::November),
            &connection,
        )
        .unwrap();
        let want = vec![
            create_transaction(Transaction::build(period.id, 1.0), &connection).unwrap(),
            create_transaction(Transaction::build(period.id, 2.0), &connection).unwrap(),
        ];
        create_transaction(Transaction::build(other_period.id, 3.0), &connection).unwrap();

        let got = list_transactions(period.id, &connection).unwrap();

        assert_eq!(got, want);
    }

    #[test]
    fn list_transactions_coerces_malformed_rows() {
        let (connection, period) = get_connection_with_period();
        connection
            .execute(
                "INSERT INTO \"transaction\" (period_id, amount, kind, note, created_at)
                VALUES (?1, 'abc', 'refund', 'legacy row', ?2)",
                (period.id, time::OffsetDateTime::now_utc()),
            )
            .unwrap();

        let got = list_transactions(period.id, &connection).unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].amount, Amount::ZERO);
        assert_eq!(got[0].kind, TransactionKind::Expense);
    }

    #[test]
    fn delete_transaction_succeeds() {
        let (connection, period) = get_connection_with_period();
        let transaction =
            create_transaction(Transaction::build(period.id, 1.0), &connection).unwrap();

        delete_transaction(transaction.id, period.id, &connection).expect("Could not delete");

        assert_eq!(
            get_transaction(transaction.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_transaction_from_other_period_fails() {
        let (connection, period) = get_connection_with_period();
        let transaction =
            create_transaction(Transaction::build(period.id, 1.0), &connection).unwrap();

        let result = delete_transaction(transaction.id, period.id + 1, &connection);

        assert_eq!(result, Err(Error::DeleteMissingTransaction));
        assert!(get_transaction(transaction.id, &connection).is_ok());
    }
}
