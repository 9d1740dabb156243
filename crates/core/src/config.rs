use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enumerations shared between configuration validation and the tool
/// registry's parameter schemas.
pub mod constants {
    pub const TODO_BUCKETS: &[&str] = &["work", "home", "errands", "personal"];
    pub const TRANSPORT_MODES: &[&str] = &["driving", "transit", "bicycling", "walking"];
    pub const COMMUTE_DIRECTIONS: &[&str] = &["to_work", "from_work"];
    pub const FINANCIAL_DATA_TYPES: &[&str] = &["stocks", "crypto", "mixed"];
    pub const WEATHER_TIMES: &[&str] = &["today", "tomorrow"];

    pub const DEFAULT_FINANCIAL_SYMBOLS: &[&str] =
        &["MSFT", "NVDA", "BTC", "ETH", "VOO", "SMR", "GOOGL"];
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub dispatch: DispatchConfig,
    pub schedule: ScheduleConfig,
    pub briefing: BriefingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Base URL of the remote tool backend; calls go to `{base_url}/tools/{name}`.
    pub base_url: String,
    pub timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Upper bound on simultaneously in-flight backend calls.
    pub max_concurrency: usize,
    pub operation_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub granularity_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct BriefingConfig {
    pub location: String,
    pub todo_bucket: String,
    pub commute_direction: String,
    pub financial_symbols: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub backend_base_url: Option<String>,
    pub backend_api_key: Option<String>,
    pub log_level: Option<String>,
    pub briefing_location: Option<String>,
    pub briefing_todo_bucket: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: String::new(),
                timeout_secs: 30,
                health_timeout_secs: 10,
                api_key: None,
            },
            dispatch: DispatchConfig {
                max_concurrency: 8,
                operation_timeout_secs: 30,
                max_retries: 3,
                retry_base_delay_ms: 1000,
                retry_max_delay_ms: 16_000,
            },
            schedule: ScheduleConfig { granularity_minutes: 15 },
            briefing: BriefingConfig {
                location: "San Francisco".to_string(),
                todo_bucket: "work".to_string(),
                commute_direction: "to_work".to_string(),
                financial_symbols: constants::DEFAULT_FINANCIAL_SYMBOLS
                    .iter()
                    .map(|symbol| symbol.to_string())
                    .collect(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("daybrief.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.backend.base_url = config.backend.base_url.trim_end_matches('/').to_string();
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
            if let Some(health_timeout_secs) = backend.health_timeout_secs {
                self.backend.health_timeout_secs = health_timeout_secs;
            }
            if let Some(api_key_value) = backend.api_key {
                self.backend.api_key = Some(api_key_value.into());
            }
        }

        if let Some(dispatch) = patch.dispatch {
            if let Some(max_concurrency) = dispatch.max_concurrency {
                self.dispatch.max_concurrency = max_concurrency;
            }
            if let Some(operation_timeout_secs) = dispatch.operation_timeout_secs {
                self.dispatch.operation_timeout_secs = operation_timeout_secs;
            }
            if let Some(max_retries) = dispatch.max_retries {
                self.dispatch.max_retries = max_retries;
            }
            if let Some(retry_base_delay_ms) = dispatch.retry_base_delay_ms {
                self.dispatch.retry_base_delay_ms = retry_base_delay_ms;
            }
            if let Some(retry_max_delay_ms) = dispatch.retry_max_delay_ms {
                self.dispatch.retry_max_delay_ms = retry_max_delay_ms;
            }
        }

        if let Some(schedule) = patch.schedule {
            if let Some(granularity_minutes) = schedule.granularity_minutes {
                self.schedule.granularity_minutes = granularity_minutes;
            }
        }

        if let Some(briefing) = patch.briefing {
            if let Some(location) = briefing.location {
                self.briefing.location = location;
            }
            if let Some(todo_bucket) = briefing.todo_bucket {
                self.briefing.todo_bucket = todo_bucket;
            }
            if let Some(commute_direction) = briefing.commute_direction {
                self.briefing.commute_direction = commute_direction;
            }
            if let Some(financial_symbols) = briefing.financial_symbols {
                self.briefing.financial_symbols = financial_symbols;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DAYBRIEF_BACKEND_BASE_URL") {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("DAYBRIEF_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_u64("DAYBRIEF_BACKEND_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DAYBRIEF_BACKEND_HEALTH_TIMEOUT_SECS") {
            self.backend.health_timeout_secs =
                parse_u64("DAYBRIEF_BACKEND_HEALTH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DAYBRIEF_BACKEND_API_KEY") {
            self.backend.api_key = Some(value.into());
        }

        if let Some(value) = read_env("DAYBRIEF_DISPATCH_MAX_CONCURRENCY") {
            self.dispatch.max_concurrency =
                parse_u64("DAYBRIEF_DISPATCH_MAX_CONCURRENCY", &value)? as usize;
        }
        if let Some(value) = read_env("DAYBRIEF_DISPATCH_OPERATION_TIMEOUT_SECS") {
            self.dispatch.operation_timeout_secs =
                parse_u64("DAYBRIEF_DISPATCH_OPERATION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DAYBRIEF_DISPATCH_MAX_RETRIES") {
            self.dispatch.max_retries = parse_u32("DAYBRIEF_DISPATCH_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("DAYBRIEF_DISPATCH_RETRY_BASE_DELAY_MS") {
            self.dispatch.retry_base_delay_ms =
                parse_u64("DAYBRIEF_DISPATCH_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("DAYBRIEF_DISPATCH_RETRY_MAX_DELAY_MS") {
            self.dispatch.retry_max_delay_ms =
                parse_u64("DAYBRIEF_DISPATCH_RETRY_MAX_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("DAYBRIEF_SCHEDULE_GRANULARITY_MINUTES") {
            self.schedule.granularity_minutes =
                parse_u64("DAYBRIEF_SCHEDULE_GRANULARITY_MINUTES", &value)? as i64;
        }

        if let Some(value) = read_env("DAYBRIEF_BRIEFING_LOCATION") {
            self.briefing.location = value;
        }
        if let Some(value) = read_env("DAYBRIEF_BRIEFING_TODO_BUCKET") {
            self.briefing.todo_bucket = value;
        }
        if let Some(value) = read_env("DAYBRIEF_BRIEFING_COMMUTE_DIRECTION") {
            self.briefing.commute_direction = value;
        }
        if let Some(value) = read_env("DAYBRIEF_BRIEFING_FINANCIAL_SYMBOLS") {
            self.briefing.financial_symbols = value
                .split(',')
                .map(|symbol| symbol.trim().to_string())
                .filter(|symbol| !symbol.is_empty())
                .collect();
        }

        if let Some(value) = read_env("DAYBRIEF_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DAYBRIEF_SERVER_PORT") {
            self.server.port = parse_u16("DAYBRIEF_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DAYBRIEF_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("DAYBRIEF_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("DAYBRIEF_LOGGING_LEVEL").or_else(|| read_env("DAYBRIEF_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DAYBRIEF_LOGGING_FORMAT").or_else(|| read_env("DAYBRIEF_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend_base_url) = overrides.backend_base_url {
            self.backend.base_url = backend_base_url;
        }
        if let Some(backend_api_key) = overrides.backend_api_key {
            self.backend.api_key = Some(backend_api_key.into());
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(briefing_location) = overrides.briefing_location {
            self.briefing.location = briefing_location;
        }
        if let Some(briefing_todo_bucket) = overrides.briefing_todo_bucket {
            self.briefing.todo_bucket = briefing_todo_bucket;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend(&self.backend)?;
        validate_dispatch(&self.dispatch)?;
        validate_schedule(&self.schedule)?;
        validate_briefing(&self.briefing)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("daybrief.toml"), PathBuf::from("config/daybrief.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    let base_url = backend.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation(
            "backend.base_url is required. Set it to the tool backend's root URL, e.g. \
             `https://tools.example.com` (or export DAYBRIEF_BACKEND_BASE_URL)"
                .to_string(),
        ));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "backend.base_url must start with http:// or https:// (got `{base_url}`)"
        )));
    }

    if backend.timeout_secs == 0 || backend.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "backend.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if backend.health_timeout_secs == 0 || backend.health_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "backend.health_timeout_secs must be in range 1..=60".to_string(),
        ));
    }

    Ok(())
}

fn validate_dispatch(dispatch: &DispatchConfig) -> Result<(), ConfigError> {
    if dispatch.max_concurrency == 0 {
        return Err(ConfigError::Validation(
            "dispatch.max_concurrency must be greater than zero".to_string(),
        ));
    }
    if dispatch.operation_timeout_secs == 0 || dispatch.operation_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "dispatch.operation_timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if dispatch.retry_base_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "dispatch.retry_base_delay_ms must be greater than zero".to_string(),
        ));
    }
    if dispatch.retry_max_delay_ms < dispatch.retry_base_delay_ms {
        return Err(ConfigError::Validation(
            "dispatch.retry_max_delay_ms must be >= dispatch.retry_base_delay_ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_schedule(schedule: &ScheduleConfig) -> Result<(), ConfigError> {
    if schedule.granularity_minutes < 1 || schedule.granularity_minutes > 240 {
        return Err(ConfigError::Validation(
            "schedule.granularity_minutes must be in range 1..=240".to_string(),
        ));
    }
    Ok(())
}

fn validate_briefing(briefing: &BriefingConfig) -> Result<(), ConfigError> {
    if briefing.location.trim().is_empty() {
        return Err(ConfigError::Validation("briefing.location must not be empty".to_string()));
    }
    if !constants::TODO_BUCKETS.contains(&briefing.todo_bucket.as_str()) {
        return Err(ConfigError::Validation(format!(
            "briefing.todo_bucket must be one of {} (got `{}`)",
            constants::TODO_BUCKETS.join("|"),
            briefing.todo_bucket
        )));
    }
    if !constants::COMMUTE_DIRECTIONS.contains(&briefing.commute_direction.as_str()) {
        return Err(ConfigError::Validation(format!(
            "briefing.commute_direction must be one of {} (got `{}`)",
            constants::COMMUTE_DIRECTIONS.join("|"),
            briefing.commute_direction
        )));
    }
    if briefing.financial_symbols.is_empty() {
        return Err(ConfigError::Validation(
            "briefing.financial_symbols must name at least one symbol".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    backend: Option<BackendPatch>,
    dispatch: Option<DispatchPatch>,
    schedule: Option<SchedulePatch>,
    briefing: Option<BriefingPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    health_timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchPatch {
    max_concurrency: Option<usize>,
    operation_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulePatch {
    granularity_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct BriefingPatch {
    location: Option<String>,
    todo_bucket: Option<String>,
    commute_direction: Option<String>,
    financial_symbols: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
