use std::fs;
use std::path::Path;
use std::sync::Arc;

use daybrief_agent::{Dispatcher, ToolRegistry};
use daybrief_core::config::{AppConfig, LoadOptions};
use daybrief_core::{Operation, OverallStatus};
use daybrief_gateway::BackendClient;

use super::{runtime, CommandResult};

pub fn run(options: LoadOptions, operations_file: &Path) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure(2, format!("configuration error: {error}")),
    };

    let raw = match fs::read_to_string(operations_file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                2,
                format!("could not read `{}`: {error}", operations_file.display()),
            )
        }
    };
    let operations: Vec<Operation> = match serde_json::from_str(&raw) {
        Ok(operations) => operations,
        Err(error) => {
            return CommandResult::failure(
                2,
                format!("`{}` is not a JSON operation list: {error}", operations_file.display()),
            )
        }
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
    let outcome = runtime.block_on(dispatcher.dispatch(operations));

    let output = serde_json::to_string_pretty(&outcome)
        .unwrap_or_else(|error| format!("{{\"error\":\"serialization failed: {error}\"}}"));
    let exit_code = u8::from(outcome.status == OverallStatus::AllFailed);
    CommandResult { exit_code, output }
}
