use chrono::NaiveDate;
use daybrief_core::config::BriefingConfig;
use daybrief_core::Operation;
use serde_json::json;

/// The standard morning operation batch: weather, calendar, todos,
/// commute, and market data, fetched in one concurrent dispatch.
///
/// Weather and calendar are marked required; the rest degrade the
/// briefing when they fail but do not make the run count as failed.
pub fn briefing_plan(config: &BriefingConfig, date: NaiveDate) -> Vec<Operation> {
    vec![
        Operation::new("weather.get_daily")
            .with_parameter("location", json!(config.location))
            .with_parameter("when", json!("today")),
        Operation::new("calendar.list_events").with_parameter("date", json!(date.to_string())),
        Operation::optional("todo.list").with_parameter("bucket", json!(config.todo_bucket)),
        Operation::optional("mobility.get_commute_options")
            .with_parameter("direction", json!(config.commute_direction)),
        Operation::optional("financial.get_data")
            .with_parameter("symbols", json!(config.financial_symbols))
            .with_parameter("data_type", json!("mixed")),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use daybrief_core::config::AppConfig;

    use super::briefing_plan;
    use crate::registry::ToolRegistry;

    #[test]
    fn every_plan_operation_resolves_and_validates_against_the_builtin_catalog() {
        let registry = ToolRegistry::builtin();
        let config = AppConfig::default().briefing;
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let plan = briefing_plan(&config, date);
        assert_eq!(plan.len(), 5);
        for operation in &plan {
            let binding = registry
                .resolve(&operation.name)
                .unwrap_or_else(|_| panic!("plan names unknown operation {}", operation.name));
            binding
                .validate(operation)
                .unwrap_or_else(|err| panic!("plan operation is invalid: {err}"));
        }
    }

    #[test]
    fn weather_and_calendar_are_required_while_extras_are_optional() {
        let config = AppConfig::default().briefing;
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let plan = briefing_plan(&config, date);
        let required: Vec<_> =
            plan.iter().filter(|op| op.required).map(|op| op.name.as_str()).collect();
        assert_eq!(required, vec!["weather.get_daily", "calendar.list_events"]);
    }
}
