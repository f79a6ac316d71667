//! Calendar months and the budget a user sets for each month.

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::{Date, Month};

use crate::{Error, amount::Amount, timezone::local_today, user::UserID};

/// Database identifier for a month's budget.
pub type PeriodId = i64;

/// A calendar month, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthKey {
    year: i32,
    month: Month,
}

impl MonthKey {
    /// The earliest month [MonthKey::parse] accepts.
    pub const FIRST: MonthKey = MonthKey {
        year: 1,
        month: Month::January,
    };

    /// The latest month [MonthKey::parse] accepts.
    pub const LAST: MonthKey = MonthKey {
        year: 9999,
        month: Month::December,
    };

    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The month containing `date`.
    pub fn from_date(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The current month in `canonical_timezone`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidTimezoneError] if `canonical_timezone` is not a known timezone.
    pub fn current(canonical_timezone: &str) -> Result<Self, Error> {
        local_today(canonical_timezone).map(Self::from_date)
    }

    /// Parse a month from `YYYY-MM`.
    ///
    /// A full `YYYY-MM-DD` date is also accepted and truncated to its month.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidMonth] if `raw` is not in either format, the
    /// year is 0000 or the month is not between 01 and 12.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidMonth(raw.to_owned());
        let trimmed = raw.trim();

        let mut parts = trimmed.splitn(3, '-');
        let year_part = parts.next().ok_or_else(invalid)?;
        let month_part = parts.next().ok_or_else(invalid)?;

        if let Some(day_part) = parts.next()
            && (day_part.len() != 2 || !day_part.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid());
        }

        if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        if month_part.len() != 2 || !month_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        if year < Self::FIRST.year {
            return Err(invalid());
        }
        let month: u8 = month_part.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self::new(year, month))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        self.month
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        match self.month {
            Month::January => Self::new(self.year - 1, Month::December),
            month => Self::new(self.year, month.previous()),
        }
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        match self.month {
            Month::December => Self::new(self.year + 1, Month::January),
            month => Self::new(self.year, month.next()),
        }
    }

    /// The `count` months ending with this one, oldest first.
    pub fn trailing(&self, count: usize) -> Vec<Self> {
        let mut months = Vec::with_capacity(count);
        let mut month = *self;

        for _ in 0..count {
            months.push(month);
            month = month.previous();
        }

        months.reverse();
        months
    }

    /// A human readable label, e.g. "October 2025".
    pub fn label(&self) -> String {
        format!("{} {}", self.month, self.year)
    }

    /// A short label for chart axes, e.g. "Oct 25".
    pub fn short_label(&self) -> String {
        let name = self.month.to_string();
        let abbreviation: String = name.chars().take(3).collect();

        format!("{abbreviation} {:02}", self.year.rem_euclid(100))
    }
}

impl PartialOrd for MonthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MonthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, u8::from(self.month)).cmp(&(other.year, u8::from(other.month)))
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, u8::from(self.month))
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonthKey::parse(s)
    }
}

impl ToSql for MonthKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for MonthKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        MonthKey::parse(text).map_err(|error| FromSqlError::Other(error.to_string().into()))
    }
}

/// The budget a user has set for one month.
///
/// Created with a budget of zero the first time the month is visited.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBudget {
    pub id: PeriodId,
    pub user_id: UserID,
    pub month: MonthKey,
    pub total_budget: Amount,
}
