use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use daybrief_agent::{Dispatcher, ScheduleError, Scheduler};
use daybrief_core::{
    AvailabilityQuery, BusyInterval, CalendarId, Candidate, DispatchOutcome, Operation,
    PreferenceWeights, TimeOfDay, TimeSlot,
};
use daybrief_gateway::BackendClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub scheduler: Arc<Scheduler>,
    pub backend: Arc<BackendClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/dispatch", post(dispatch))
        .route("/schedule/search", post(schedule_search))
        .route("/schedule/conflicts", post(schedule_conflicts))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub operations: Vec<Operation>,
}

/// Partial failure is data, not an HTTP error: the response is 200 whenever
/// the batch executed, and per-operation failures live inside the outcome.
pub async fn dispatch(
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> Json<DispatchOutcome> {
    debug!(operations = request.operations.len(), "dispatch request received");
    Json(state.dispatcher.dispatch(request.operations).await)
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub calendars: Vec<String>,
    #[serde(default)]
    pub prefer: Option<TimeOfDay>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub candidates: Vec<Candidate>,
}

pub async fn schedule_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let weights = match request.prefer {
        Some(time_of_day) => PreferenceWeights::preferring(time_of_day),
        None => PreferenceWeights::default(),
    };
    let query = AvailabilityQuery::new(
        TimeSlot::new(request.window_start, request.window_end),
        Duration::minutes(request.duration_minutes),
        request.calendars.into_iter().map(CalendarId::new).collect(),
    )
    .with_weights(weights);

    let mut candidates = state.scheduler.find_available(&query).await?;
    if let Some(limit) = request.limit {
        candidates.truncate(limit);
    }
    Ok(Json(SearchResponse { candidates }))
}

#[derive(Debug, Deserialize)]
pub struct ConflictsRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub calendars: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConflictsResponse {
    pub conflicts: Vec<BusyInterval>,
    pub conflict_free: bool,
}

pub async fn schedule_conflicts(
    State(state): State<AppState>,
    Json(request): Json<ConflictsRequest>,
) -> Result<Json<ConflictsResponse>, ApiError> {
    let proposed = TimeSlot::new(request.start, request.end);
    let calendars: Vec<CalendarId> = request.calendars.into_iter().map(CalendarId::new).collect();

    let conflicts = state.scheduler.detect_conflicts(&proposed, &calendars).await?;
    let conflict_free = conflicts.is_empty();
    Ok(Json(ConflictsResponse { conflicts, conflict_free }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps scheduling failures onto the HTTP boundary: structural query
/// errors are the caller's fault (400), upstream calendar failures are a
/// bad gateway (502).
#[derive(Debug)]
pub struct ApiError(ScheduleError);

impl From<ScheduleError> for ApiError {
    fn from(error: ScheduleError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScheduleError::Query(_) => StatusCode::BAD_REQUEST,
            ScheduleError::CalendarRead { .. } | ScheduleError::Payload { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}
