//! The session token stored, encrypted, in the auth cookie.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::user::UserID;

mod expiry_format {
    //! Serializes the expiry with a fixed-width hour.
    //!
    //! The default [time::OffsetDateTime] serialization writes midnight as
    //! "0:00:00.0", which it then fails to parse.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// e.g. "2021-01-01 00:00:00.0 +00:00:00".
    const EXPIRY_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(expiry: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = expiry
            .format(EXPIRY_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&raw, EXPIRY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Identifies the logged-in user until `expires_at`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(with = "expiry_format")]
    pub expires_at: OffsetDateTime,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
mod token_tests {
    use time::{Duration, OffsetDateTime, UtcOffset, macros::datetime};

    use crate::{auth::Token, user::UserID};

    #[test]
    fn serializes_with_padded_time() {
        let token = Token {
            user_id: UserID::new(3),
            expires_at: datetime!(2025-12-21 03:54:00).assume_offset(UtcOffset::UTC),
        };

        let got = serde_json::to_string(&token).unwrap();

        assert_eq!(
            got,
            r#"{"user_id":3,"expires_at":"2025-12-21 03:54:00.0 +00:00:00"}"#
        );
    }

    #[test]
    fn parses_midnight_expiry() {
        let raw = r#"{"user_id":3,"expires_at":"2025-12-21 00:00:00.0 +13:00:00"}"#;
        let want = Token {
            user_id: UserID::new(3),
            expires_at: datetime!(2025-12-21 00:00:00 +13),
        };

        let got: Token = serde_json::from_str(raw).unwrap();

        assert_eq!(got, want);
    }

    #[test]
    fn expired_only_after_expiry() {
        let live = Token {
            user_id: UserID::new(1),
            expires_at: OffsetDateTime::now_utc() + Duration::minutes(1),
        };
        let dead = Token {
            user_id: UserID::new(1),
            expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
        };

        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }
}
