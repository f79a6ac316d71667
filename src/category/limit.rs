//! Database operations for per-month category limits.

use rusqlite::{Connection, Row, ffi};

use crate::{
    Error,
    amount::Amount,
    category::{CategoryId, CategoryLimit, CategoryLimitId},
    period::PeriodId,
    user::UserID,
};

/// Initialize the category limit table and indexes.
pub fn create_category_limit_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category_limit (
            id INTEGER PRIMARY KEY,
            period_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            UNIQUE(period_id, category_id),
            FOREIGN KEY(period_id) REFERENCES period(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_limit_period ON category_limit(period_id);",
    )?;

    Ok(())
}

/// Set the limit for `category_id` in the month `period_id`, replacing any
/// existing limit for the pair.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidAmount] if `amount` is zero.
/// - [Error::InvalidCategory] if `category_id` does not refer to a category.
pub fn set_category_limit(
    period_id: PeriodId,
    category_id: CategoryId,
    amount: Amount,
    connection: &Connection,
) -> Result<CategoryLimit, Error> {
    if amount == Amount::ZERO {
        return Err(Error::InvalidAmount(amount.to_string()));
    }

    connection
        .prepare(
            "INSERT INTO category_limit (period_id, category_id, amount) VALUES (?1, ?2, ?3)
            ON CONFLICT(period_id, category_id) DO UPDATE SET amount = excluded.amount
            RETURNING id, period_id, category_id, amount",
        )?
        .query_row((period_id, category_id, amount), map_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                ffi::Error {
                    code: _,
                    extended_code: ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(Some(category_id)),
            error => error.into(),
        })
}

/// Retrieve the limits set for the month `period_id`.
pub fn get_category_limits(
    period_id: PeriodId,
    connection: &Connection,
) -> Result<Vec<CategoryLimit>, Error> {
    connection
        .prepare(
            "SELECT id, period_id, category_id, amount FROM category_limit
            WHERE period_id = :period_id ORDER BY id ASC",
        )?
        .query_map(&[(":period_id", &period_id)], map_row)?
        .map(|maybe_limit| maybe_limit.map_err(|error| error.into()))
        .collect()
}

/// Remove a limit, as long as it belongs to one of `user_id`'s months.
///
/// # Errors
///
/// Returns [Error::DeleteMissingCategoryLimit] if no such limit belongs to the user.
pub fn delete_category_limit(
    limit_id: CategoryLimitId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category_limit
        WHERE id = ?1 AND period_id IN (SELECT id FROM period WHERE user_id = ?2)",
        (limit_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategoryLimit);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<CategoryLimit, rusqlite::Error> {
    Ok(CategoryLimit {
        id: row.get(0)?,
        period_id: row.get(1)?,
        category_id: row.get(2)?,
        amount: row.get(3)?,
    })
}

#[cfg(test)]
mod category_limit_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        amount::Amount,
        category::{
            Category, CategoryName, create_category, delete_category_limit, get_category_limits,
            set_category_limit,
        },
        period::{MonthKey, PeriodBudget, get_or_create_period_budget},
        test_utils::{get_test_connection, insert_test_user},
        transaction::list_transactions,
    };

    fn get_fixture() -> (Connection, PeriodBudget, Category) {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let period =
            get_or_create_period_budget(user.id, MonthKey::parse("2025-10").unwrap(), &connection)
                .unwrap();
        let category = create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();

        (connection, period, category)
    }

    #[test]
    fn set_limit_succeeds_without_creating_transactions() {
        let (connection, period, category) = get_fixture();

        let limit = set_category_limit(period.id, category.id, Amount::coerce(200.0), &connection)
            .expect("Could not set limit");

        assert_eq!(limit.amount, Amount::coerce(200.0));
        assert_eq!(get_category_limits(period.id, &connection), Ok(vec![limit]));
        assert_eq!(list_transactions(period.id, &connection), Ok(vec![]));
    }

    #[test]
    fn set_limit_replaces_existing_limit() {
        let (connection, period, category) = get_fixture();
        let first =
            set_category_limit(period.id, category.id, Amount::coerce(200.0), &connection).unwrap();

        let second =
            set_category_limit(period.id, category.id, Amount::coerce(50.0), &connection).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            get_category_limits(period.id, &connection).unwrap(),
            vec![second]
        );
    }

    #[test]
    fn set_limit_rejects_zero() {
        let (connection, period, category) = get_fixture();

        let result = set_category_limit(period.id, category.id, Amount::ZERO, &connection);

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn set_limit_for_unknown_category_fails() {
        let (connection, period, _) = get_fixture();

        let result = set_category_limit(period.id, 999, Amount::coerce(1.0), &connection);

        assert_eq!(result, Err(Error::InvalidCategory(Some(999))));
    }

    #[test]
    fn delete_limit_is_scoped_to_owner() {
        let (connection, period, category) = get_fixture();
        let limit =
            set_category_limit(period.id, category.id, Amount::coerce(20.0), &connection).unwrap();
        let stranger = insert_test_user("stranger@example.com", &connection);

        assert_eq!(
            delete_category_limit(limit.id, stranger.id, &connection),
            Err(Error::DeleteMissingCategoryLimit)
        );
        assert_eq!(
            delete_category_limit(limit.id, period.user_id, &connection),
            Ok(())
        );
        assert_eq!(get_category_limits(period.id, &connection), Ok(vec![]));
    }
}
