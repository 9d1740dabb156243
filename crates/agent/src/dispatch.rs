use std::sync::Arc;
use std::time::{Duration, Instant};

use daybrief_core::config::DispatchConfig;
use daybrief_core::{DispatchOutcome, Operation, OperationResult, OperationStatus};
use daybrief_gateway::{GatewayError, ToolTransport};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::registry::{RegistryError, ToolRegistry};

/// Executes operation batches concurrently against the backend.
///
/// Failure containment is the contract: resolution and validation misses
/// become immediate `Failed` results, every resolved call runs to its own
/// conclusion (success, failure, or timeout), and the batch always yields
/// exactly one result per submitted operation, in submission order. A
/// single stalled tool never cancels its siblings.
pub struct Dispatcher {
    registry: ToolRegistry,
    transport: Arc<dyn ToolTransport>,
    config: DispatchConfig,
    permits: Arc<Semaphore>,
}

enum Slot {
    Immediate(OperationResult),
    InFlight { operation_name: String, required: bool, handle: JoinHandle<OperationResult> },
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        transport: Arc<dyn ToolTransport>,
        config: DispatchConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency));
        Self { registry, transport, config, permits }
    }

    pub async fn dispatch(&self, operations: Vec<Operation>) -> DispatchOutcome {
        let batch_id = Uuid::new_v4();
        debug!(batch_id = %batch_id, operations = operations.len(), "dispatching operation batch");

        let mut slots = Vec::with_capacity(operations.len());
        for operation in operations {
            match self.prepare(&operation) {
                Ok(endpoint) => {
                    let operation_name = operation.name.clone();
                    let required = operation.required;
                    let handle = tokio::spawn(execute(
                        Arc::clone(&self.transport),
                        Arc::clone(&self.permits),
                        self.config.clone(),
                        operation,
                        endpoint,
                        batch_id,
                    ));
                    slots.push(Slot::InFlight { operation_name, required, handle });
                }
                Err(error) => {
                    warn!(
                        batch_id = %batch_id,
                        operation = %operation.name,
                        error = %error,
                        "operation rejected before dispatch"
                    );
                    slots.push(Slot::Immediate(OperationResult::failed(
                        &operation,
                        error.to_string(),
                        Duration::ZERO,
                    )));
                }
            }
        }

        // Barrier: collect every outcome before returning. No fail-fast
        // cancellation of siblings; a succeeded tool's result stays useful
        // even when its neighbor fails.
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Immediate(result) => results.push(result),
                Slot::InFlight { operation_name, required, handle } => match handle.await {
                    Ok(result) => results.push(result),
                    Err(join_error) => results.push(OperationResult {
                        operation_name,
                        status: OperationStatus::Failed,
                        payload: None,
                        error: Some(format!("operation task aborted: {join_error}")),
                        required,
                        elapsed: Duration::ZERO,
                    }),
                },
            }
        }

        let outcome = DispatchOutcome::from_results(results);
        info!(
            batch_id = %batch_id,
            status = ?outcome.status,
            results = outcome.results.len(),
            "dispatch batch complete"
        );
        outcome
    }

    fn prepare(&self, operation: &Operation) -> Result<String, RegistryError> {
        let binding = self.registry.resolve(&operation.name)?;
        binding.validate(operation)?;
        Ok(binding.endpoint().to_string())
    }
}

async fn execute(
    transport: Arc<dyn ToolTransport>,
    permits: Arc<Semaphore>,
    config: DispatchConfig,
    operation: Operation,
    endpoint: String,
    batch_id: Uuid,
) -> OperationResult {
    let timeout = Duration::from_secs(config.operation_timeout_secs);
    let started = Instant::now();

    // The per-operation deadline covers queueing for a concurrency permit
    // as well as every retry attempt.
    let attempt = tokio::time::timeout(timeout, async {
        let _permit = permits.acquire().await.map_err(|_| GatewayError::Transport {
            endpoint: endpoint.clone(),
            message: "dispatcher concurrency limiter closed".to_string(),
        })?;
        invoke_with_retry(transport.as_ref(), &operation, &endpoint, timeout, &config, batch_id)
            .await
    })
    .await;

    match attempt {
        Ok(Ok(payload)) => {
            debug!(batch_id = %batch_id, operation = %operation.name, "operation succeeded");
            OperationResult::succeeded(&operation, payload, started.elapsed())
        }
        Ok(Err(error)) if error.is_timeout() => {
            warn!(batch_id = %batch_id, operation = %operation.name, "operation timed out");
            OperationResult::timed_out(&operation, timeout, started.elapsed())
        }
        Ok(Err(error)) => {
            warn!(
                batch_id = %batch_id,
                operation = %operation.name,
                error = %error,
                "operation failed"
            );
            OperationResult::failed(&operation, error.to_string(), started.elapsed())
        }
        Err(_elapsed) => {
            warn!(batch_id = %batch_id, operation = %operation.name, "operation timed out");
            OperationResult::timed_out(&operation, timeout, started.elapsed())
        }
    }
}

async fn invoke_with_retry(
    transport: &dyn ToolTransport,
    operation: &Operation,
    endpoint: &str,
    call_timeout: Duration,
    config: &DispatchConfig,
    batch_id: Uuid,
) -> Result<serde_json::Value, GatewayError> {
    let mut delay = Duration::from_millis(config.retry_base_delay_ms);
    let max_delay = Duration::from_millis(config.retry_max_delay_ms);
    let mut attempt: u32 = 0;

    loop {
        match transport.invoke(endpoint, &operation.parameters, call_timeout).await {
            Ok(payload) => return Ok(payload),
            Err(error) if error.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                debug!(
                    batch_id = %batch_id,
                    operation = %operation.name,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying operation after transient failure"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use daybrief_core::config::DispatchConfig;
    use daybrief_core::{Operation, OperationStatus, OverallStatus};
    use daybrief_gateway::{GatewayError, ToolTransport};
    use serde_json::{json, Map, Value};

    use super::Dispatcher;
    use crate::registry::ToolRegistry;

    #[derive(Clone)]
    enum Behavior {
        Succeed(Value),
        RemoteError(u16),
        Hang,
        /// Fail with a transport error this many times, then succeed.
        FlakyTransport(Arc<AtomicUsize>, Value),
    }

    struct FakeTransport {
        behaviors: HashMap<String, Behavior>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeTransport {
        fn new(behaviors: Vec<(&str, Behavior)>) -> Arc<Self> {
            Arc::new(Self {
                behaviors: behaviors
                    .into_iter()
                    .map(|(endpoint, behavior)| (endpoint.to_string(), behavior))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn call_count(&self, endpoint: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|called| *called == endpoint).count()
        }
    }

    #[async_trait]
    impl ToolTransport for FakeTransport {
        async fn invoke(
            &self,
            endpoint: &str,
            _parameters: &Map<String, Value>,
            _timeout: Duration,
        ) -> Result<Value, GatewayError> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let behavior = self.behaviors.get(endpoint).cloned().unwrap_or(Behavior::Hang);
            let result = match behavior {
                Behavior::Succeed(payload) => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(payload)
                }
                Behavior::RemoteError(status) => Err(GatewayError::Remote {
                    endpoint: endpoint.to_string(),
                    status,
                    message: "backend rejected the call".to_string(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Value::Null)
                }
                Behavior::FlakyTransport(remaining, payload) => {
                    if remaining
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok()
                    {
                        Err(GatewayError::Transport {
                            endpoint: endpoint.to_string(),
                            message: "connection reset".to_string(),
                        })
                    } else {
                        Ok(payload)
                    }
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn test_config() -> DispatchConfig {
        DispatchConfig {
            max_concurrency: 8,
            operation_timeout_secs: 1,
            max_retries: 3,
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 4,
        }
    }

    fn dispatcher(transport: Arc<FakeTransport>, config: DispatchConfig) -> Dispatcher {
        Dispatcher::new(ToolRegistry::builtin(), transport, config)
    }

    fn weather_op() -> Operation {
        Operation::new("weather.get_daily").with_parameter("location", json!("San Francisco"))
    }

    fn calendar_op() -> Operation {
        Operation::new("calendar.list_events").with_parameter("date", json!("2025-06-02"))
    }

    fn todo_op() -> Operation {
        Operation::optional("todo.list").with_parameter("bucket", json!("work"))
    }

    #[tokio::test]
    async fn timed_out_sibling_does_not_sink_the_batch() {
        // weather succeeds, calendar hangs past its deadline, todos succeed.
        let transport = FakeTransport::new(vec![
            ("/tools/weather.get_daily", Behavior::Succeed(json!({"summary": "Clear"}))),
            ("/tools/calendar.list_events", Behavior::Hang),
            ("/tools/todo.list", Behavior::Succeed(json!({"pending_count": 2}))),
        ]);
        let dispatcher = dispatcher(Arc::clone(&transport), test_config());

        let outcome = dispatcher.dispatch(vec![weather_op(), calendar_op(), todo_op()]).await;

        assert_eq!(outcome.status, OverallStatus::PartialFailure);
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[0].status, OperationStatus::Success);
        assert_eq!(outcome.results[1].status, OperationStatus::TimedOut);
        assert_eq!(outcome.results[2].status, OperationStatus::Success);
        assert_eq!(outcome.results[0].payload.as_ref().unwrap()["summary"], "Clear");
    }

    #[tokio::test]
    async fn results_keep_submission_order_with_one_result_per_operation() {
        let transport = FakeTransport::new(vec![
            ("/tools/weather.get_daily", Behavior::Succeed(json!({}))),
            ("/tools/calendar.list_events", Behavior::Succeed(json!({}))),
            ("/tools/todo.list", Behavior::Succeed(json!({}))),
        ]);
        let dispatcher = dispatcher(transport, test_config());

        let outcome = dispatcher.dispatch(vec![todo_op(), weather_op(), calendar_op()]).await;

        let names: Vec<_> =
            outcome.results.iter().map(|result| result.operation_name.as_str()).collect();
        assert_eq!(names, vec!["todo.list", "weather.get_daily", "calendar.list_events"]);
        assert_eq!(outcome.status, OverallStatus::AllSucceeded);
    }

    #[tokio::test]
    async fn unknown_operation_fails_immediately_without_reaching_the_backend() {
        let transport = FakeTransport::new(vec![(
            "/tools/weather.get_daily",
            Behavior::Succeed(json!({})),
        )]);
        let dispatcher = dispatcher(Arc::clone(&transport), test_config());

        let outcome = dispatcher
            .dispatch(vec![Operation::new("weather.get_hourly"), weather_op()])
            .await;

        assert_eq!(outcome.status, OverallStatus::PartialFailure);
        assert_eq!(outcome.results[0].status, OperationStatus::Failed);
        assert!(outcome.results[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("unknown operation"));
        assert_eq!(transport.call_count("/tools/weather.get_hourly"), 0);
        assert_eq!(outcome.results[1].status, OperationStatus::Success);
    }

    #[tokio::test]
    async fn validation_failure_names_the_offending_field() {
        let transport = FakeTransport::new(vec![]);
        let dispatcher = dispatcher(transport, test_config());

        let invalid = Operation::new("todo.list").with_parameter("bucket", json!("chores"));
        let outcome = dispatcher.dispatch(vec![invalid]).await;

        assert_eq!(outcome.status, OverallStatus::AllFailed);
        assert!(outcome.results[0].error.as_deref().unwrap_or_default().contains("bucket"));
    }

    #[tokio::test]
    async fn every_operation_failing_yields_all_failed() {
        let transport = FakeTransport::new(vec![
            ("/tools/weather.get_daily", Behavior::RemoteError(500)),
            ("/tools/todo.list", Behavior::RemoteError(503)),
        ]);
        let mut config = test_config();
        config.max_retries = 0;
        let dispatcher = dispatcher(transport, config);

        let outcome = dispatcher.dispatch(vec![weather_op(), todo_op()]).await;

        assert_eq!(outcome.status, OverallStatus::AllFailed);
        assert!(outcome.representative_error().unwrap_or_default().contains("500"));
    }

    #[tokio::test]
    async fn transient_transport_failure_is_retried_to_success() {
        let transport = FakeTransport::new(vec![(
            "/tools/weather.get_daily",
            Behavior::FlakyTransport(Arc::new(AtomicUsize::new(2)), json!({"summary": "Fog"})),
        )]);
        let dispatcher = dispatcher(Arc::clone(&transport), test_config());

        let outcome = dispatcher.dispatch(vec![weather_op()]).await;

        assert_eq!(outcome.status, OverallStatus::AllSucceeded);
        assert_eq!(transport.call_count("/tools/weather.get_daily"), 3);
    }

    #[tokio::test]
    async fn client_side_remote_error_is_not_retried() {
        let transport =
            FakeTransport::new(vec![("/tools/todo.list", Behavior::RemoteError(400))]);
        let dispatcher = dispatcher(Arc::clone(&transport), test_config());

        let outcome = dispatcher.dispatch(vec![todo_op()]).await;

        assert_eq!(outcome.status, OverallStatus::AllFailed);
        assert_eq!(transport.call_count("/tools/todo.list"), 1);
    }

    #[tokio::test]
    async fn concurrent_fan_out_respects_the_configured_bound() {
        let transport = FakeTransport::new(vec![
            ("/tools/weather.get_daily", Behavior::Succeed(json!({}))),
            ("/tools/calendar.list_events", Behavior::Succeed(json!({}))),
            ("/tools/todo.list", Behavior::Succeed(json!({}))),
            (
                "/tools/mobility.get_commute",
                Behavior::Succeed(json!({"duration": "24 mins"})),
            ),
        ]);
        let mut config = test_config();
        config.max_concurrency = 2;
        let dispatcher = dispatcher(Arc::clone(&transport), config);

        let commute = Operation::new("mobility.get_commute")
            .with_parameter("origin", json!("Home"))
            .with_parameter("destination", json!("Office"));
        let outcome =
            dispatcher.dispatch(vec![weather_op(), calendar_op(), todo_op(), commute]).await;

        assert_eq!(outcome.status, OverallStatus::AllSucceeded);
        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_batch_returns_empty_all_succeeded_outcome() {
        let transport = FakeTransport::new(vec![]);
        let dispatcher = dispatcher(transport, test_config());

        let outcome = dispatcher.dispatch(Vec::new()).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.status, OverallStatus::AllSucceeded);
    }
}
