use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub backend: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = backend_check(&state).await;
    let ready = backend.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "daybrief-server runtime initialized".to_string(),
        },
        backend,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn backend_check(state: &AppState) -> HealthCheck {
    match state.backend.health_check().await {
        Ok(()) => {
            HealthCheck { status: "ready", detail: "tool backend responded".to_string() }
        }
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("tool backend check failed: {error}"),
        },
    }
}
