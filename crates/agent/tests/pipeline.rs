//! End-to-end pipeline tests: operations flow through the registry and
//! dispatcher into the availability engine, with the backend replaced by
//! an in-memory transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use daybrief_agent::{Dispatcher, ScheduleError, Scheduler, ToolRegistry};
use daybrief_core::config::DispatchConfig;
use daybrief_core::{
    AvailabilityEngine, AvailabilityQuery, CalendarId, PreferenceWeights, QueryError, TimeOfDay,
    TimeSlot,
};
use daybrief_gateway::{GatewayError, ToolTransport};
use serde_json::{json, Map, Value};

/// Serves canned per-calendar event payloads for
/// `calendar.list_events_range`; calendars absent from the map fail with a
/// remote error.
struct CalendarBackend {
    calendars: HashMap<String, Value>,
}

impl CalendarBackend {
    fn new(calendars: Vec<(&str, Value)>) -> Arc<Self> {
        Arc::new(Self {
            calendars: calendars
                .into_iter()
                .map(|(name, events)| (name.to_string(), events))
                .collect(),
        })
    }
}

#[async_trait]
impl ToolTransport for CalendarBackend {
    async fn invoke(
        &self,
        endpoint: &str,
        parameters: &Map<String, Value>,
        _timeout: Duration,
    ) -> Result<Value, GatewayError> {
        assert_eq!(endpoint, "/tools/calendar.list_events_range");
        let calendar = parameters
            .get("calendar_name")
            .and_then(Value::as_str)
            .unwrap_or("primary")
            .to_string();

        self.calendars.get(&calendar).cloned().ok_or(GatewayError::Remote {
            endpoint: endpoint.to_string(),
            status: 404,
            message: format!("calendar `{calendar}` is not connected"),
        })
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

fn event(id: &str, start: &str, end: &str) -> Value {
    json!({"id": id, "title": id, "start_time": start, "end_time": end})
}

fn scheduler(transport: Arc<CalendarBackend>) -> Scheduler {
    let config = DispatchConfig {
        max_concurrency: 4,
        operation_timeout_secs: 5,
        max_retries: 0,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 4,
    };
    let dispatcher = Arc::new(Dispatcher::new(ToolRegistry::builtin(), transport, config));
    Scheduler::new(dispatcher, AvailabilityEngine::new())
}

#[tokio::test]
async fn find_available_merges_busy_time_across_calendars() {
    let transport = CalendarBackend::new(vec![
        (
            "personal",
            json!({"events": [
                event("standup", "2025-06-02T09:00:00", "2025-06-02T10:00:00"),
            ]}),
        ),
        (
            "family",
            json!({"events": [
                event("school-run", "2025-06-02T11:00:00", "2025-06-02T12:00:00"),
            ]}),
        ),
    ]);

    let query = AvailabilityQuery::new(
        TimeSlot::new(at(9, 0), at(13, 0)),
        chrono::Duration::minutes(30),
        vec![CalendarId::new("personal"), CalendarId::new("family")],
    );

    let candidates = scheduler(transport).find_available(&query).await.expect("candidates");
    assert!(!candidates.is_empty());
    for candidate in &candidates {
        let in_first_gap = candidate.start >= at(10, 0) && candidate.end <= at(11, 0);
        let in_second_gap = candidate.start >= at(12, 0) && candidate.end <= at(13, 0);
        assert!(in_first_gap || in_second_gap, "candidate {candidate:?} overlaps busy time");
    }
}

#[tokio::test]
async fn afternoon_preference_reorders_candidates() {
    let transport = CalendarBackend::new(vec![("personal", json!({"events": []}))]);

    let query = AvailabilityQuery::new(
        TimeSlot::new(at(9, 0), at(17, 0)),
        chrono::Duration::minutes(60),
        vec![CalendarId::new("personal")],
    )
    .with_weights(PreferenceWeights {
        time_of_day: Some(TimeOfDay::Afternoon),
        time_of_day_weight: 10.0,
        earliness_weight: 0.1,
        buffer_weight: 0.0,
    });

    let candidates = scheduler(transport).find_available(&query).await.expect("candidates");
    let top = candidates.first().expect("at least one candidate");
    assert!(top.start >= at(12, 0), "top candidate {top:?} should sit in the afternoon");
}

#[tokio::test]
async fn failed_calendar_read_aborts_the_query_instead_of_guessing() {
    let transport = CalendarBackend::new(vec![("personal", json!({"events": []}))]);

    let query = AvailabilityQuery::new(
        TimeSlot::new(at(9, 0), at(13, 0)),
        chrono::Duration::minutes(30),
        vec![CalendarId::new("personal"), CalendarId::new("work")],
    );

    let error = scheduler(transport).find_available(&query).await.expect_err("hard failure");
    match error {
        ScheduleError::CalendarRead { calendar, reason } => {
            assert_eq!(calendar, "work");
            assert!(reason.contains("not connected"));
        }
        other => panic!("expected calendar read failure, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_calendar_payload_is_a_payload_error() {
    let transport = CalendarBackend::new(vec![(
        "personal",
        json!({"events": [ {"id": "x", "start_time": "not-a-time", "end_time": "also-not"} ]}),
    )]);

    let query = AvailabilityQuery::new(
        TimeSlot::new(at(9, 0), at(13, 0)),
        chrono::Duration::minutes(30),
        vec![CalendarId::new("personal")],
    );

    let error = scheduler(transport).find_available(&query).await.expect_err("payload error");
    assert!(matches!(error, ScheduleError::Payload { .. }));
}

#[tokio::test]
async fn detect_conflicts_reports_partial_overlaps() {
    let transport = CalendarBackend::new(vec![(
        "personal",
        json!({"events": [
            event("standup", "2025-06-02T09:00:00", "2025-06-02T10:00:00"),
        ]}),
    )]);

    let proposed = TimeSlot::new(at(9, 30), at(10, 30));
    let conflicts = scheduler(transport)
        .detect_conflicts(&proposed, &[CalendarId::new("personal")])
        .await
        .expect("conflicts");

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].source_event_id, "standup");
}

#[tokio::test]
async fn invalid_queries_fail_before_any_backend_call() {
    // A transport with no calendars: any dispatch would error loudly.
    let transport = CalendarBackend::new(vec![]);
    let scheduler = scheduler(transport);

    let inverted = AvailabilityQuery::new(
        TimeSlot::new(at(13, 0), at(9, 0)),
        chrono::Duration::minutes(30),
        vec![CalendarId::new("personal")],
    );
    let error = scheduler.find_available(&inverted).await.expect_err("invalid window");
    assert!(matches!(
        error,
        ScheduleError::Query(QueryError::InvalidWindow { .. })
    ));

    let no_calendars = AvailabilityQuery::new(
        TimeSlot::new(at(9, 0), at(13, 0)),
        chrono::Duration::minutes(30),
        Vec::new(),
    );
    let error = scheduler.find_available(&no_calendars).await.expect_err("empty calendar set");
    assert!(matches!(error, ScheduleError::Query(QueryError::EmptyCalendarSet)));
}
