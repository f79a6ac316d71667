//! Database queries for the transaction history and the spending totals on
//! the dashboards.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::CategoryName,
    db::like_pattern,
    period::{MonthKey, PeriodId},
    transaction::{Transaction, db::map_row},
};

/// The order to list a month's transactions in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently added first.
    #[default]
    Newest,
    /// Smallest amount first.
    AmountAscending,
    /// Largest amount first.
    AmountDescending,
}

impl SortOrder {
    /// Read the `sort` query parameter. Anything other than `asc` or `desc`
    /// is [SortOrder::Newest].
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("asc") => SortOrder::AmountAscending,
            Some("desc") => SortOrder::AmountDescending,
            _ => SortOrder::Newest,
        }
    }

    /// The value for the `sort` query parameter, if any.
    pub fn as_query_value(&self) -> Option<&'static str> {
        match self {
            SortOrder::Newest => None,
            SortOrder::AmountAscending => Some("asc"),
            SortOrder::AmountDescending => Some("desc"),
        }
    }

    fn order_clause(&self) -> &'static str {
        // Ties are broken by ID so paging is stable.
        match self {
            SortOrder::Newest => "ORDER BY t.created_at DESC, t.id DESC",
            SortOrder::AmountAscending => "ORDER BY t.amount ASC, t.id ASC",
            SortOrder::AmountDescending => "ORDER BY t.amount DESC, t.id DESC",
        }
    }
}

/// A transaction with the name of its category, for the history table.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction: Transaction,
    pub category_name: Option<CategoryName>,
}

fn map_transaction_row(row: &Row) -> Result<TransactionRow, rusqlite::Error> {
    let category_name = row
        .get::<_, Option<String>>(7)?
        .map(|name| CategoryName::new_unchecked(&name));

    Ok(TransactionRow {
        transaction: map_row(row)?,
        category_name,
    })
}

/// Retrieve a page of the transactions in `period_id` whose note contains
/// `search`, ignoring case.
///
/// An empty `search` matches every transaction.
pub fn search_transactions(
    period_id: PeriodId,
    search: &str,
    sort_order: SortOrder,
    limit: i64,
    offset: i64,
    connection: &Connection,
) -> Result<Vec<TransactionRow>, Error> {
    let query = format!(
        "SELECT t.id, t.period_id, t.category_id, t.amount, t.kind, t.note, t.created_at, c.name
        FROM \"transaction\" t
        LEFT JOIN category c ON t.category_id = c.id
        WHERE t.period_id = ?1 AND t.note LIKE ?2 ESCAPE '\\'
        {}
        LIMIT ?3 OFFSET ?4",
        sort_order.order_clause()
    );

    connection
        .prepare(&query)?
        .query_map(
            (period_id, like_pattern(search), limit, offset),
            map_transaction_row,
        )?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

/// The number of transactions [search_transactions] would return without paging.
pub fn count_search_transactions(
    period_id: PeriodId,
    search: &str,
    connection: &Connection,
) -> Result<u64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM \"transaction\"
        WHERE period_id = ?1 AND note LIKE ?2 ESCAPE '\\'",
        (period_id, like_pattern(search)),
        |row| row.get(0),
    )?;

    Ok(count.max(0) as u64)
}

/// The number of transactions recorded by all users in `month`.
pub fn count_transactions_in_month(month: MonthKey, connection: &Connection) -> Result<u64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(t.id) FROM \"transaction\" t
        INNER JOIN period p ON t.period_id = p.id
        WHERE p.month = ?1",
        (month,),
        |row| row.get(0),
    )?;

    Ok(count.max(0) as u64)
}

/// Net spending (expenses minus income) across all users for each month from
/// `first` to `last` inclusive, oldest first.
///
/// Months without any transactions are absent.
pub fn total_spent_by_month(
    first: MonthKey,
    last: MonthKey,
    connection: &Connection,
) -> Result<Vec<(MonthKey, f64)>, Error> {
    connection
        .prepare(
            "SELECT p.month,
                SUM(CASE WHEN t.kind = 'income' THEN -t.amount ELSE t.amount END)
            FROM \"transaction\" t
            INNER JOIN period p ON t.period_id = p.id
            WHERE p.month BETWEEN ?1 AND ?2
            GROUP BY p.month
            ORDER BY p.month ASC",
        )?
        .query_map((first, last), |row| {
            let total: Option<f64> = row.get(1)?;
            Ok((row.get(0)?, total.filter(|total| total.is_finite()).unwrap_or(0.0)))
        })?
        .map(|maybe_total| maybe_total.map_err(|error| error.into()))
        .collect()
}
