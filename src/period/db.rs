//! Database operations for monthly budgets.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    amount::Amount,
    period::{MonthKey, PeriodBudget, PeriodId},
    user::UserID,
};

/// Initialize the period table and indexes.
pub fn create_period_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS period (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            month TEXT NOT NULL,
            total_budget REAL NOT NULL DEFAULT 0,
            UNIQUE(user_id, month),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_period_user_month ON period(user_id, month);",
    )?;

    Ok(())
}

/// Get the budget for `month`, creating it with a budget of zero if the user
/// has not visited the month before.
///
/// Calling this any number of times for the same user and month yields the
/// same record.
pub fn get_or_create_period_budget(
    user_id: UserID,
    month: MonthKey,
    connection: &Connection,
) -> Result<PeriodBudget, Error> {
    connection.execute(
        "INSERT INTO period (user_id, month, total_budget) VALUES (?1, ?2, 0)
        ON CONFLICT(user_id, month) DO NOTHING;",
        (user_id.as_i64(), month),
    )?;

    connection
        .prepare(
            "SELECT id, user_id, month, total_budget FROM period
            WHERE user_id = ?1 AND month = ?2;",
        )?
        .query_row((user_id.as_i64(), month), map_row)
        .map_err(|error| error.into())
}

/// Retrieve a month's budget by ID.
pub fn get_period_budget(
    period_id: PeriodId,
    connection: &Connection,
) -> Result<PeriodBudget, Error> {
    connection
        .prepare("SELECT id, user_id, month, total_budget FROM period WHERE id = :id;")?
        .query_row(&[(":id", &period_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve the budgets `user_id` has for the months from `first` to `last` inclusive,
/// oldest first. Months the user never visited are absent.
pub fn get_period_budgets_between(
    user_id: UserID,
    first: MonthKey,
    last: MonthKey,
    connection: &Connection,
) -> Result<Vec<PeriodBudget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, month, total_budget FROM period
            WHERE user_id = ?1 AND month BETWEEN ?2 AND ?3
            ORDER BY month ASC;",
        )?
        .query_map((user_id.as_i64(), first, last), map_row)?
        .map(|maybe_period| maybe_period.map_err(|error| error.into()))
        .collect()
}

/// Set the total budget for a month and return the updated record.
///
/// # Errors
///
/// Returns [Error::UpdateMissingPeriod] if `period_id` does not exist.
pub fn update_budget(
    period_id: PeriodId,
    total_budget: Amount,
    connection: &Connection,
) -> Result<PeriodBudget, Error> {
    let rows_affected = connection.execute(
        "UPDATE period SET total_budget = ?1 WHERE id = ?2",
        (total_budget, period_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingPeriod);
    }

    get_period_budget(period_id, connection)
}

fn map_row(row: &Row) -> Result<PeriodBudget, rusqlite::Error> {
    Ok(PeriodBudget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        month: row.get(2)?,
        total_budget: row.get(3)?,
    })
}

#[cfg(test)]
mod period_query_tests {
    use rusqlite::Connection;
    use time::Month;

    use crate::{
        Error,
        amount::Amount,
        period::{
            MonthKey, get_or_create_period_budget, get_period_budget, get_period_budgets_between,
            update_budget,
        },
        test_utils::{get_test_connection, insert_test_user},
        user::UserID,
    };

    fn october() -> MonthKey {
        MonthKey::new(2025, Month::October)
    }

    fn get_connection_with_user() -> (Connection, UserID) {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        (connection, user.id)
    }

    #[test]
    fn creates_budget_of_zero_on_first_visit() {
        let (connection, user_id) = get_connection_with_user();

        let period = get_or_create_period_budget(user_id, october(), &connection)
            .expect("Could not get period");

        assert!(period.id > 0);
        assert_eq!(period.user_id, user_id);
        assert_eq!(period.month, october());
        assert_eq!(period.total_budget, Amount::ZERO);
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let (connection, user_id) = get_connection_with_user();

        let first = get_or_create_period_budget(user_id, october(), &connection).unwrap();
        let second = get_or_create_period_budget(user_id, october(), &connection).unwrap();

        assert_eq!(first, second);
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM period", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn months_are_separate_per_user() {
        let (connection, user_id) = get_connection_with_user();
        let other_user = insert_test_user("other@example.com", &connection);

        let mine = get_or_create_period_budget(user_id, october(), &connection).unwrap();
        let theirs = get_or_create_period_budget(other_user.id, october(), &connection).unwrap();

        assert_ne!(mine.id, theirs.id);
    }

    #[test]
    fn update_budget_succeeds() {
        let (connection, user_id) = get_connection_with_user();
        let period = get_or_create_period_budget(user_id, october(), &connection).unwrap();

        let updated = update_budget(period.id, Amount::coerce(1000.0), &connection)
            .expect("Could not update budget");

        assert_eq!(updated.total_budget, Amount::coerce(1000.0));
        assert_eq!(
            get_period_budget(period.id, &connection).unwrap().total_budget,
            Amount::coerce(1000.0)
        );
    }

    #[test]
    fn update_budget_keeps_existing_budget_on_revisit() {
        let (connection, user_id) = get_connection_with_user();
        let period = get_or_create_period_budget(user_id, october(), &connection).unwrap();
        update_budget(period.id, Amount::coerce(250.0), &connection).unwrap();

        let revisited = get_or_create_period_budget(user_id, october(), &connection).unwrap();

        assert_eq!(revisited.total_budget, Amount::coerce(250.0));
    }

    #[test]
    fn update_budget_with_invalid_id_returns_error() {
        let connection = get_test_connection();

        let result = update_budget(4242, Amount::coerce(1.0), &connection);

        assert_eq!(result, Err(Error::UpdateMissingPeriod));
    }

    #[test]
    fn get_period_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_period_budget(4242, &connection), Err(Error::NotFound));
    }

    #[test]
    fn budgets_between_are_sorted_and_bounded() {
        let (connection, user_id) = get_connection_with_user();
        for month in [
            MonthKey::new(2025, Month::December),
            MonthKey::new(2025, Month::August),
            october(),
            MonthKey::new(2025, Month::September),
        ] {
            get_or_create_period_budget(user_id, month, &connection).unwrap();
        }

        let got = get_period_budgets_between(
            user_id,
            MonthKey::new(2025, Month::September),
            MonthKey::new(2025, Month::November),
            &connection,
        )
        .unwrap()
        .into_iter()
        .map(|period| period.month)
        .collect::<Vec<_>>();

        assert_eq!(got, [MonthKey::new(2025, Month::September), october()]);
    }
}
