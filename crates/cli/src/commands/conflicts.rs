use daybrief_agent::ScheduleError;
use daybrief_core::config::{AppConfig, LoadOptions};
use daybrief_core::{CalendarId, TimeSlot};

use super::{parse_timestamp, runtime, CommandResult};
use crate::commands::find::build_scheduler;

pub fn run(
    options: LoadOptions,
    start: &str,
    end: &str,
    calendars: Vec<String>,
) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(2, format!("configuration error: {error}")),
    };

    let proposed = match (parse_timestamp(start), parse_timestamp(end)) {
        (Ok(start), Ok(end)) => TimeSlot::new(start, end),
        (Err(error), _) | (_, Err(error)) => return CommandResult::failure(2, error),
    };
    let calendars: Vec<CalendarId> = calendars.into_iter().map(CalendarId::new).collect();

    let scheduler = match build_scheduler(&config) {
        Ok(scheduler) => scheduler,
        Err(error) => return CommandResult::failure(1, error),
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure(1, error),
    };

    match runtime.block_on(scheduler.detect_conflicts(&proposed, &calendars)) {
        Ok(conflicts) if conflicts.is_empty() => {
            CommandResult::success("no conflicts: the proposed slot is free")
        }
        Ok(conflicts) => {
            let mut lines = vec![format!("{} conflict(s):", conflicts.len())];
            for conflict in &conflicts {
                lines.push(format!(
                    "- {} {} - {}  (calendar {}, event {})",
                    conflict.start.format("%Y-%m-%d"),
                    conflict.start.format("%H:%M"),
                    conflict.end.format("%H:%M"),
                    conflict.calendar_id,
                    conflict.source_event_id,
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
