use chrono::{DateTime, Utc};
use thiserror::Error;

/// Structural errors in an availability query.
///
/// These fail fast and never produce a partial result: a malformed query is
/// the caller's fault, unlike per-operation dispatch failures which are
/// contained inside a `DispatchOutcome`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("search window is empty or inverted ({start} >= {end})")]
    InvalidWindow { start: DateTime<Utc>, end: DateTime<Utc> },
    #[error("requested slot duration must be positive")]
    ZeroDuration,
    #[error("availability query names no calendars")]
    EmptyCalendarSet,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::QueryError;

    #[test]
    fn invalid_window_message_names_both_bounds() {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();

        let message = QueryError::InvalidWindow { start, end }.to_string();
        assert!(message.contains("2025-06-02 13:00:00"));
        assert!(message.contains("2025-06-02 09:00:00"));
    }
}
