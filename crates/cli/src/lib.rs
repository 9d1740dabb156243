pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use daybrief_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "daybrief",
    about = "Daybrief operator CLI",
    long_about = "Run morning briefings, availability searches, and conflict checks \
                  against the configured tool backend.",
    after_help = "Examples:\n  daybrief briefing\n  daybrief find --from 2025-06-02T09:00 \
                  --to 2025-06-02T17:00 --duration-minutes 30 --calendar personal\n  daybrief doctor --json"
)]
pub struct Cli {
    /// Path to daybrief.toml (defaults to ./daybrief.toml, then ./config/daybrief.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Fetch and render the morning briefing (weather, calendar, todos, commute, markets)")]
    Briefing {
        #[arg(long, help = "Briefing date as YYYY-MM-DD (defaults to today)")]
        date: Option<String>,
    },
    #[command(about = "Dispatch an explicit operation batch from a JSON file and print the outcome")]
    Dispatch {
        #[arg(long, help = "Path to a JSON array of operations")]
        operations_file: PathBuf,
    },
    #[command(about = "Find free slots of a given duration across one or more calendars")]
    Find {
        #[arg(long, help = "Window start (RFC 3339 or YYYY-MM-DDTHH:MM, read as UTC)")]
        from: String,
        #[arg(long, help = "Window end")]
        to: String,
        #[arg(long, help = "Slot length in minutes")]
        duration_minutes: u32,
        #[arg(long = "calendar", required = true, help = "Calendar to search (repeatable)")]
        calendars: Vec<String>,
        #[arg(long, help = "Preferred time of day: morning|afternoon|evening")]
        prefer: Option<String>,
        #[arg(long, default_value_t = 5, help = "Maximum candidates to print")]
        limit: usize,
    },
    #[command(about = "List busy intervals conflicting with a proposed slot")]
    Conflicts {
        #[arg(long, help = "Proposed slot start")]
        start: String,
        #[arg(long, help = "Proposed slot end")]
        end: String,
        #[arg(long = "calendar", required = true, help = "Calendar to check (repeatable)")]
        calendars: Vec<String>,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config, briefing plan, and backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    let result = match cli.command {
        Command::Briefing { date } => commands::briefing::run(options, date),
        Command::Dispatch { operations_file } => commands::dispatch::run(options, &operations_file),
        Command::Find { from, to, duration_minutes, calendars, prefer, limit } => {
            commands::find::run(options, &from, &to, duration_minutes, calendars, prefer, limit)
        }
        Command::Conflicts { start, end, calendars } => {
            commands::conflicts::run(options, &start, &end, calendars)
        }
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
