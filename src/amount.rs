//! Money amounts as entered by users and as found in the database.
//!
//! User input is parsed strictly with [Amount::parse]. Values read back from
//! the database go through the lenient [FromSql] impl: rows written by older
//! clients may hold text such as `"abc"` or NULL in the amount column, and
//! these read as zero instead of failing the whole query.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A finite dollar amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Amount(f64);

impl Amount {
    pub const ZERO: Amount = Amount(0.0);

    /// Parse user input as a non-negative amount.
    ///
    /// Surrounding whitespace, a leading dollar sign and thousands separators
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `raw` is not a number, is not finite
    /// or is negative.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let cleaned: String = raw
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        match cleaned.parse::<f64>() {
            Ok(value) => Self::new(value).map_err(|_| Error::InvalidAmount(raw.to_owned())),
            Err(_) => Err(Error::InvalidAmount(raw.to_owned())),
        }
    }

    /// Parse user input as an amount greater than zero.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if [Amount::parse] would, or if the
    /// amount is zero.
    pub fn parse_positive(raw: &str) -> Result<Self, Error> {
        let amount = Self::parse(raw)?;

        if amount == Self::ZERO {
            Err(Error::InvalidAmount(raw.to_owned()))
        } else {
            Ok(amount)
        }
    }

    /// Create an amount from a number.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `value` is NaN, infinite or negative.
    pub fn new(value: f64) -> Result<Self, Error> {
        if value.is_finite() && value >= 0.0 {
            // Normalise -0.0 so it displays as zero.
            Ok(Self(value.abs()))
        } else {
            Err(Error::InvalidAmount(value.to_string()))
        }
    }

    /// Coerce a raw number to an amount, treating non-finite values as zero.
    pub fn coerce(value: f64) -> Self {
        if value.is_finite() {
            Self(value)
        } else {
            Self::ZERO
        }
    }

    /// Coerce text to an amount, treating anything that is not a finite number as zero.
    pub fn coerce_str(raw: &str) -> Self {
        raw.trim()
            .parse::<f64>()
            .map(Self::coerce)
            .unwrap_or(Self::ZERO)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let amount = match value {
            ValueRef::Real(number) => Amount::coerce(number),
            ValueRef::Integer(number) => Amount::coerce(number as f64),
            ValueRef::Text(text) => std::str::from_utf8(text)
                .map(Amount::coerce_str)
                .unwrap_or(Amount::ZERO),
            ValueRef::Null | ValueRef::Blob(_) => Amount::ZERO,
        };

        Ok(amount)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}
