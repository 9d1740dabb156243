use daybrief_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(2, format!("configuration error: {error}")),
    };

    CommandResult::success(render(&config))
}

fn render(config: &AppConfig) -> String {
    let api_key = if config.backend.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let symbols = config.briefing.financial_symbols.join(", ");

    [
        "[backend]".to_string(),
        format!("base_url = {}", config.backend.base_url),
        format!("timeout_secs = {}", config.backend.timeout_secs),
        format!("health_timeout_secs = {}", config.backend.health_timeout_secs),
        format!("api_key = {api_key}"),
        String::new(),
        "[dispatch]".to_string(),
        format!("max_concurrency = {}", config.dispatch.max_concurrency),
        format!("operation_timeout_secs = {}", config.dispatch.operation_timeout_secs),
        format!("max_retries = {}", config.dispatch.max_retries),
        format!("retry_base_delay_ms = {}", config.dispatch.retry_base_delay_ms),
        format!("retry_max_delay_ms = {}", config.dispatch.retry_max_delay_ms),
        String::new(),
        "[schedule]".to_string(),
        format!("granularity_minutes = {}", config.schedule.granularity_minutes),
        String::new(),
        "[briefing]".to_string(),
        format!("location = {}", config.briefing.location),
        format!("todo_bucket = {}", config.briefing.todo_bucket),
        format!("commute_direction = {}", config.briefing.commute_direction),
        format!("financial_symbols = {symbols}"),
        String::new(),
        "[server]".to_string(),
        format!("bind_address = {}", config.server.bind_address),
        format!("port = {}", config.server.port),
        format!("graceful_shutdown_secs = {}", config.server.graceful_shutdown_secs),
        String::new(),
        "[logging]".to_string(),
        format!("level = {}", config.logging.level),
        format!("format = {:?}", config.logging.format).to_lowercase(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use daybrief_core::config::AppConfig;

    use super::render;

    #[test]
    fn secrets_are_redacted_in_rendered_config() {
        let mut config = AppConfig::default();
        config.backend.base_url = "https://tools.example.com".to_string();
        config.backend.api_key = Some("very-secret".to_string().into());

        let rendered = render(&config);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("very-secret"));
    }
}
