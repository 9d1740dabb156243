use std::process::ExitCode;

fn main() -> ExitCode {
    daybrief_cli::run()
}
