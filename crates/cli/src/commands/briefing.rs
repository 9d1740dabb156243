use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use daybrief_agent::{briefing_plan, Dispatcher, ToolRegistry};
use daybrief_core::config::{AppConfig, LoadOptions};
use daybrief_core::{DispatchOutcome, OperationResult, OverallStatus};
use daybrief_gateway::BackendClient;
use serde_json::Value;

use super::{runtime, CommandResult};

pub fn run(options: LoadOptions, date: Option<String>) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(2, format!("configuration error: {error}")),
    };

    let date = match date {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(parsed) => parsed,
            Err(_) => {
                return CommandResult::failure(
                    2,
                    format!("could not parse `{raw}` as a date (expected YYYY-MM-DD)"),
                )
            }
        },
        None => Utc::now().date_naive(),
    };

    let client = match BackendClient::from_config(&config.backend) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure(1, error.to_string()),
    };
    let dispatcher =
        Dispatcher::new(ToolRegistry::builtin(), Arc::new(client), config.dispatch.clone());

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure(1, error),
    };
    let outcome = runtime.block_on(dispatcher.dispatch(briefing_plan(&config.briefing, date)));

    let output = render_briefing(&outcome, date);
    if outcome.status == OverallStatus::AllFailed {
        let detail = outcome.representative_error().unwrap_or("all tools failed").to_string();
        return CommandResult::failure(1, format!("briefing failed: {detail}"));
    }
    let exit_code = u8::from(outcome.has_required_failure());
    CommandResult { exit_code, output }
}

fn render_briefing(outcome: &DispatchOutcome, date: NaiveDate) -> String {
    let mut lines = vec![format!("Morning briefing for {date}")];
    for result in &outcome.results {
        lines.push(render_result(result));
    }
    lines.join("\n")
}

fn render_result(result: &OperationResult) -> String {
    let title = section_title(&result.operation_name);
    match (&result.payload, &result.error) {
        (Some(payload), _) => format!("{title}: {}", render_payload(&result.operation_name, payload)),
        (None, Some(error)) => format!("{title}: unavailable ({error})"),
        (None, None) => format!("{title}: unavailable"),
    }
}

fn section_title(operation_name: &str) -> &'static str {
    match operation_name {
        "weather.get_daily" => "Weather",
        "calendar.list_events" => "Calendar",
        "todo.list" => "Todos",
        "mobility.get_commute_options" | "mobility.get_commute" => "Commute",
        "financial.get_data" => "Markets",
        _ => "Tool",
    }
}

fn render_payload(operation_name: &str, payload: &Value) -> String {
    match operation_name {
        "weather.get_daily" => render_weather(payload),
        "calendar.list_events" => render_calendar(payload),
        "todo.list" => render_todos(payload),
        "mobility.get_commute_options" | "mobility.get_commute" => render_commute(payload),
        "financial.get_data" => render_financial(payload),
        _ => payload.to_string(),
    }
}

fn render_weather(payload: &Value) -> String {
    let summary = text(payload, "summary").unwrap_or("n/a");
    let mut parts = vec![summary.to_string()];
    if let Some(high) = number(payload, "temp_hi") {
        parts.push(format!("high {high}\u{b0}F"));
    }
    if let Some(low) = number(payload, "temp_lo") {
        parts.push(format!("low {low}\u{b0}F"));
    }
    if let Some(precip) = number(payload, "precip_chance") {
        parts.push(format!("{precip}% precipitation"));
    }
    parts.join(", ")
}

fn render_calendar(payload: &Value) -> String {
    let total = number(payload, "total_events").unwrap_or(0);
    if total == 0 {
        return "no events scheduled".to_string();
    }

    let mut lines = vec![format!("{total} events")];
    let events = payload.get("events").and_then(Value::as_array);
    for event in events.into_iter().flatten().take(3) {
        let title = text(event, "title").unwrap_or("untitled");
        let time = text(event, "time")
            .or_else(|| text(event, "start_time"))
            .unwrap_or("all day");
        lines.push(format!("  - {title} at {time}"));
    }
    if total > 3 {
        lines.push(format!("  ... and {} more", total - 3));
    }
    lines.join("\n")
}

fn render_todos(payload: &Value) -> String {
    let pending = number(payload, "pending_count").unwrap_or(0);
    if pending == 0 {
        return "no pending tasks".to_string();
    }

    let mut lines = vec![format!("{pending} pending tasks")];
    let items: Vec<&Value> = payload
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default();

    // Surface high-priority items first, mirroring how the backend ranks them.
    let (high, rest): (Vec<&Value>, Vec<&Value>) =
        items.into_iter().partition(|item| text(item, "priority") == Some("high"));
    for item in high.iter().take(2).chain(rest.iter().take(3)) {
        let priority = text(item, "priority").unwrap_or("medium");
        let title = text(item, "title").unwrap_or("untitled");
        lines.push(format!("  - [{priority}] {title}"));
    }
    lines.join("\n")
}

fn render_commute(payload: &Value) -> String {
    let duration = text(payload, "duration").unwrap_or("n/a");
    match text(payload, "destination") {
        Some(destination) => format!("{duration} to {destination}"),
        None => duration.to_string(),
    }
}

fn render_financial(payload: &Value) -> String {
    let mut lines = Vec::new();
    if let Some(summary) = text(payload, "summary") {
        lines.push(summary.to_string());
    }
    let items = payload.get("data").and_then(Value::as_array);
    for item in items.into_iter().flatten() {
        let symbol = text(item, "symbol").unwrap_or("?");
        let price = item.get("price").and_then(Value::as_f64).unwrap_or(0.0);
        let change = item.get("change").and_then(Value::as_f64).unwrap_or(0.0);
        let change_pct = item.get("change_percent").and_then(Value::as_f64).unwrap_or(0.0);
        lines.push(format!("  {symbol}: ${price:.2} {change:+.2} ({change_pct:+.1}%)"));
    }
    if lines.is_empty() {
        return "no data available".to_string();
    }
    lines.join("\n")
}

fn text<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn number(value: &Value, field: &str) -> Option<i64> {
    value.get(field).and_then(Value::as_i64)
}
