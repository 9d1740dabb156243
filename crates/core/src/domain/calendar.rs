use std::fmt;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarId(pub String);

impl CalendarId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("busy interval must satisfy start < end ({start} >= {end})")]
    Inverted { start: DateTime<Utc>, end: DateTime<Utc> },
}

/// A half-open time range `[start, end)` during which a calendar is
/// occupied. Construction enforces `start < end`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub calendar_id: CalendarId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_event_id: String,
}

impl BusyInterval {
    pub fn new(
        calendar_id: CalendarId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_event_id: impl Into<String>,
    ) -> Result<Self, IntervalError> {
        if start >= end {
            return Err(IntervalError::Inverted { start, end });
        }
        Ok(Self { calendar_id, start, end, source_event_id: source_event_id.into() })
    }

    /// Half-open overlap test: `[start, end)` intersects `[self.start, self.end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && self.start < end
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalendarPayloadError {
    #[error("calendar payload has no `events` array")]
    MissingEvents,
    #[error("calendar event {index} is not an object")]
    NotAnObject { index: usize },
    #[error("calendar event {index} is missing field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("calendar event {index} has unparseable timestamp `{value}`")]
    InvalidTimestamp { index: usize, value: String },
    #[error("calendar event {index} spans an empty or inverted range: {source}")]
    InvalidInterval { index: usize, source: IntervalError },
}

/// Extract busy intervals from a calendar-read payload.
///
/// The backend's calendar tools return `{"events": [...], ...}` where each
/// event carries `start_time`/`end_time` as ISO timestamps, or a date plus
/// `all_day: true`. All-day events become whole-day busy spans; that is the
/// conservative reading for availability computation. Parsing is strict:
/// one malformed event fails the whole payload, because free-slot answers
/// over a partially parsed busy set would be silently wrong.
pub fn busy_intervals_from_events(
    calendar_id: &CalendarId,
    payload: &Value,
) -> Result<Vec<BusyInterval>, CalendarPayloadError> {
    let events = payload
        .get("events")
        .and_then(Value::as_array)
        .ok_or(CalendarPayloadError::MissingEvents)?;

    let mut intervals = Vec::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        let event = event.as_object().ok_or(CalendarPayloadError::NotAnObject { index })?;

        let start_raw = event
            .get("start_time")
            .and_then(Value::as_str)
            .ok_or(CalendarPayloadError::MissingField { index, field: "start_time" })?;
        let source_event_id = event
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("event-{index}"));
        let all_day = event.get("all_day").and_then(Value::as_bool).unwrap_or(false);

        let (start, end) = if all_day || parse_date(start_raw).is_some() {
            let start_date = parse_date(start_raw)
                .or_else(|| parse_timestamp(start_raw).map(|ts| ts.date_naive()))
                .ok_or_else(|| CalendarPayloadError::InvalidTimestamp {
                    index,
                    value: start_raw.to_string(),
                })?;
            let end_date = match event.get("end_time").and_then(Value::as_str) {
                Some(end_raw) => parse_date(end_raw)
                    .or_else(|| parse_timestamp(end_raw).map(|ts| ts.date_naive()))
                    .ok_or_else(|| CalendarPayloadError::InvalidTimestamp {
                        index,
                        value: end_raw.to_string(),
                    })?,
                None => start_date,
            };
            (day_start(start_date), day_start(end_date.checked_add_days(Days::new(1)).unwrap_or(end_date)))
        } else {
            let end_raw = event
                .get("end_time")
                .and_then(Value::as_str)
                .ok_or(CalendarPayloadError::MissingField { index, field: "end_time" })?;
            let start = parse_timestamp(start_raw).ok_or_else(|| {
                CalendarPayloadError::InvalidTimestamp { index, value: start_raw.to_string() }
            })?;
            let end = parse_timestamp(end_raw).ok_or_else(|| {
                CalendarPayloadError::InvalidTimestamp { index, value: end_raw.to_string() }
            })?;
            (start, end)
        };

        let interval = BusyInterval::new(calendar_id.clone(), start, end, source_event_id)
            .map_err(|source| CalendarPayloadError::InvalidInterval { index, source })?;
        intervals.push(interval);
    }

    Ok(intervals)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DDTHH:MM[:SS]` timestamp, which the
/// backend emits without an offset; naive values are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    None
}
