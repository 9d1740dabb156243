use std::sync::Arc;

use chrono::Duration;
use daybrief_agent::{Dispatcher, ScheduleError, Scheduler, ToolRegistry};
use daybrief_core::config::{AppConfig, LoadOptions};
use daybrief_core::{
    AvailabilityEngine, AvailabilityQuery, CalendarId, PreferenceWeights, TimeOfDay, TimeSlot,
};
use daybrief_gateway::BackendClient;

use super::{parse_timestamp, runtime, CommandResult};

pub fn run(
    options: LoadOptions,
    from: &str,
    to: &str,
    duration_minutes: u32,
    calendars: Vec<String>,
    prefer: Option<String>,
    limit: usize,
) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(2, format!("configuration error: {error}")),
    };

    let window = match (parse_timestamp(from), parse_timestamp(to)) {
        (Ok(start), Ok(end)) => TimeSlot::new(start, end),
        (Err(error), _) | (_, Err(error)) => return CommandResult::failure(2, error),
    };

    let weights = match prefer.as_deref() {
        None => PreferenceWeights::default(),
        Some("morning") => PreferenceWeights::preferring(TimeOfDay::Morning),
        Some("afternoon") => PreferenceWeights::preferring(TimeOfDay::Afternoon),
        Some("evening") => PreferenceWeights::preferring(TimeOfDay::Evening),
        Some(other) => {
            return CommandResult::failure(
                2,
                format!("unknown preference `{other}` (expected morning|afternoon|evening)"),
            )
        }
    };

    let query = AvailabilityQuery::new(
        window,
        Duration::minutes(i64::from(duration_minutes)),
        calendars.into_iter().map(CalendarId::new).collect(),
    )
    .with_weights(weights);

    let scheduler = match build_scheduler(&config) {
        Ok(scheduler) => scheduler,
        Err(error) => return CommandResult::failure(1, error),
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure(1, error),
    };

    match runtime.block_on(scheduler.find_available(&query)) {
        Ok(candidates) if candidates.is_empty() => {
            CommandResult::success("no availability in the requested window")
        }
        Ok(candidates) => {
            let mut lines =
                vec![format!("{} candidate slot(s), best first:", candidates.len().min(limit))];
            for (rank, candidate) in candidates.iter().take(limit).enumerate() {
                lines.push(format!(
                    "{}. {} - {}  (score {:.2})",
                    rank + 1,
                    candidate.start.format("%Y-%m-%d %H:%M"),
                    candidate.end.format("%H:%M"),
                    candidate.score,
                ));
            }
            CommandResult::success(lines.join("\n"))
        }
        Err(error @ ScheduleError::Query(_)) => {
            CommandResult::failure(2, format!("invalid query: {error}"))
        }
        Err(error) => CommandResult::failure(1, error.to_string()),
    }
}

pub(crate) fn build_scheduler(config: &AppConfig) -> Result<Scheduler, String> {
    let client = BackendClient::from_config(&config.backend).map_err(|err| err.to_string())?;
    let dispatcher =
        Dispatcher::new(ToolRegistry::builtin(), Arc::new(client), config.dispatch.clone());
    let engine =
        AvailabilityEngine::with_granularity(Duration::minutes(config.schedule.granularity_minutes));
    Ok(Scheduler::new(Arc::new(dispatcher), engine))
}
