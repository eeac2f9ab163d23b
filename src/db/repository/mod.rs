//! Repository layer: entity-scoped database operations.
//!
//! Ids are stored as hyphenated TEXT, timestamps as RFC 3339 with fixed
//! microsecond precision (so they sort lexicographically), dates as `%Y-%m-%d`.

pub mod alerts;
pub mod audit;
pub mod observations;
pub mod outbox;
pub mod patients;
pub mod users;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub(crate) fn fmt_ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("timestamp {raw}: {e}")))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("date {raw}: {e}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_opt_uuid(raw: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    raw.as_deref().map(parse_uuid).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_and_sort() {
        let a: DateTime<Utc> = "2026-03-10T12:00:00Z".parse().unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert_eq!(parse_ts(&fmt_ts(&a)).unwrap(), a);
        assert!(fmt_ts(&a) < fmt_ts(&b));
    }

    #[test]
    fn malformed_values_are_constraint_violations() {
        assert!(matches!(
            parse_date("not-a-date"),
            Err(DatabaseError::ConstraintViolation(_))
        ));
        assert!(parse_uuid("nope").is_err());
        assert_eq!(parse_opt_uuid(None).unwrap(), None);
    }
}
