use chrono::Utc;
use daybrief_agent::{briefing_plan, ToolRegistry};
use daybrief_core::config::{AppConfig, LoadOptions};
use daybrief_gateway::BackendClient;
use serde::Serialize;

use super::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = u8::from(report.overall_status != CheckStatus::Pass);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!("{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed: {error}\"}}")
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_briefing_plan(&config));
            checks.push(check_backend_reachability(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "briefing_plan",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Dry-run the briefing plan against the builtin catalog, so a bad
/// configured bucket or direction shows up here instead of at 7am.
fn check_briefing_plan(config: &AppConfig) -> DoctorCheck {
    let registry = ToolRegistry::builtin();
    let plan = briefing_plan(&config.briefing, Utc::now().date_naive());

    for operation in &plan {
        let validated = registry
            .resolve(&operation.name)
            .and_then(|binding| binding.validate(operation));
        if let Err(error) = validated {
            return DoctorCheck {
                name: "briefing_plan",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    }

    DoctorCheck {
        name: "briefing_plan",
        status: CheckStatus::Pass,
        details: format!("{} operations resolve and validate", plan.len()),
    }
}

fn check_backend_reachability(config: &AppConfig) -> DoctorCheck {
    let client = match BackendClient::from_config(&config.backend) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: error.to_string(),
            }
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck { name: "backend_reachability", status: CheckStatus::Fail, details: error }
        }
    };

    match runtime.block_on(client.health_check()) {
        Ok(()) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!("backend at {} is healthy", config.backend.base_url),
        },
        Err(error) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "skipped",
        };
        lines.push(format!("  [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
