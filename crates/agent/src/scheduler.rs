use std::sync::Arc;

use daybrief_core::{
    busy_intervals_from_events, AvailabilityEngine, AvailabilityQuery, BusyInterval, CalendarId,
    CalendarPayloadError, Candidate, Operation, QueryError, TimeSlot,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::dispatch::Dispatcher;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("calendar `{calendar}` could not be read: {reason}")]
    CalendarRead { calendar: String, reason: String },
    #[error("calendar `{calendar}` returned an unreadable payload: {source}")]
    Payload {
        calendar: String,
        #[source]
        source: CalendarPayloadError,
    },
}

/// Caller-facing scheduling surface: fetches busy intervals through the
/// dispatcher, then hands them to the availability engine.
///
/// Calendar reads are all-or-nothing. A free-slot answer computed over an
/// incomplete busy set would be confidently wrong, so one failed calendar
/// read aborts the whole query instead of degrading it.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    engine: AvailabilityEngine,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, engine: AvailabilityEngine) -> Self {
        Self { dispatcher, engine }
    }

    pub async fn find_available(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<Candidate>, ScheduleError> {
        // Structural validation before any network traffic.
        query.validate()?;

        let busy = self.read_busy(&query.calendars, &query.window).await?;
        debug!(
            calendars = query.calendars.len(),
            busy_intervals = busy.len(),
            "computing availability"
        );
        Ok(self.engine.find_available(query, &busy)?)
    }

    pub async fn detect_conflicts(
        &self,
        proposed: &TimeSlot,
        calendars: &[CalendarId],
    ) -> Result<Vec<BusyInterval>, ScheduleError> {
        proposed.validate()?;
        if calendars.is_empty() {
            return Err(QueryError::EmptyCalendarSet.into());
        }

        let busy = self.read_busy(calendars, proposed).await?;
        Ok(self.engine.detect_conflicts(proposed, &busy)?)
    }

    async fn read_busy(
        &self,
        calendars: &[CalendarId],
        window: &TimeSlot,
    ) -> Result<Vec<BusyInterval>, ScheduleError> {
        let operations: Vec<Operation> = calendars
            .iter()
            .map(|calendar| {
                Operation::new("calendar.list_events_range")
                    .with_parameter("start_date", json!(window.start.date_naive().to_string()))
                    .with_parameter("end_date", json!(window.end.date_naive().to_string()))
                    .with_parameter("calendar_name", json!(calendar.as_str()))
            })
            .collect();

        let outcome = self.dispatcher.dispatch(operations).await;

        let mut busy = Vec::new();
        for (calendar, result) in calendars.iter().zip(outcome.results.iter()) {
            if !result.is_success() {
                return Err(ScheduleError::CalendarRead {
                    calendar: calendar.to_string(),
                    reason: result
                        .error
                        .clone()
                        .unwrap_or_else(|| "calendar read failed".to_string()),
                });
            }

            let payload = result.payload.clone().unwrap_or(Value::Null);
            let intervals =
                busy_intervals_from_events(calendar, &payload).map_err(|source| {
                    ScheduleError::Payload { calendar: calendar.to_string(), source }
                })?;
            busy.extend(intervals);
        }

        Ok(busy)
    }
}
