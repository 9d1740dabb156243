use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One named, parameterized unit of work dispatched to the tool backend.
///
/// Immutable once constructed; a fresh batch is built per incoming request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Whether the surrounding request is degraded when this operation
    /// fails. Dispatch semantics ignore this flag; renderers and exit-code
    /// decisions consume it through `DispatchOutcome::has_required_failure`.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Map::new(), required: true }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self { required: false, ..Self::new(name) }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Failed,
    TimedOut,
}

/// Outcome of a single dispatched operation.
///
/// Exactly one `OperationResult` exists per submitted `Operation`,
/// regardless of how the call ended. The constructors keep the
/// payload/error pairing consistent with the status: a success carries a
/// payload and no error, everything else carries an error and no payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation_name: String,
    pub status: OperationStatus,
    pub payload: Option<Value>,
    pub error: Option<String>,
    pub required: bool,
    pub elapsed: Duration,
}

impl OperationResult {
    pub fn succeeded(operation: &Operation, payload: Value, elapsed: Duration) -> Self {
        Self {
            operation_name: operation.name.clone(),
            status: OperationStatus::Success,
            payload: Some(payload),
            error: None,
            required: operation.required,
            elapsed,
        }
    }

    pub fn failed(operation: &Operation, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            operation_name: operation.name.clone(),
            status: OperationStatus::Failed,
            payload: None,
            error: Some(error.into()),
            required: operation.required,
            elapsed,
        }
    }

    pub fn timed_out(operation: &Operation, timeout: Duration, elapsed: Duration) -> Self {
        Self {
            operation_name: operation.name.clone(),
            status: OperationStatus::TimedOut,
            payload: None,
            error: Some(format!("operation timed out after {}s", timeout.as_secs())),
            required: operation.required,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

/// Aggregate result of one concurrently executed operation batch.
///
/// Results keep submission order. Derived per request, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub results: Vec<OperationResult>,
    pub status: OverallStatus,
}

impl DispatchOutcome {
    /// Derive the overall status from individual results.
    ///
    /// An empty batch counts as `AllSucceeded`: "every result succeeded"
    /// holds vacuously, and the all-failed classification requires at
    /// least one non-success result.
    pub fn from_results(results: Vec<OperationResult>) -> Self {
        let status = if results.iter().all(OperationResult::is_success) {
            OverallStatus::AllSucceeded
        } else if results.iter().any(OperationResult::is_success) {
            OverallStatus::PartialFailure
        } else {
            OverallStatus::AllFailed
        };
        Self { results, status }
    }

    pub fn result(&self, operation_name: &str) -> Option<&OperationResult> {
        self.results.iter().find(|result| result.operation_name == operation_name)
    }

    pub fn successes(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|result| result.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|result| !result.is_success())
    }

    pub fn has_required_failure(&self) -> bool {
        self.failures().any(|result| result.required)
    }

    /// The most specific error to surface when the whole batch failed.
    ///
    /// Prefers a concrete remote/transport message over a timeout notice,
    /// so a fully failed dispatch does not collapse into a generic
    /// "something went wrong".
    pub fn representative_error(&self) -> Option<&str> {
        let failed = self
            .results
            .iter()
            .find(|result| result.status == OperationStatus::Failed)
            .and_then(|result| result.error.as_deref());
        failed.or_else(|| self.failures().next().and_then(|result| result.error.as_deref()))
    }
}
