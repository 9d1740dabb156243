pub mod briefing;
pub mod config;
pub mod conflicts;
pub mod dispatch;
pub mod doctor;
pub mod find;

use chrono::{DateTime, NaiveDateTime, Utc};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(exit_code: u8, message: impl Into<String>) -> Self {
        Self { exit_code, output: message.into() }
    }
}

/// Commands run on a private current-thread runtime: the CLI entry points
/// are synchronous and each invocation performs one bounded unit of work.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DDTHH:MM[:SS]` stamp read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed.and_utc());
        }
    }
    Err(format!("could not parse `{raw}` as a timestamp (expected RFC 3339 or YYYY-MM-DDTHH:MM)"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::parse_timestamp;

    #[test]
    fn accepts_rfc3339_and_naive_stamps() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-06-02T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-06-02T09:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-06-02T09:30").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_with_a_hint() {
        let error = parse_timestamp("tomorrow-ish").unwrap_err();
        assert!(error.contains("RFC 3339"));
    }
}
