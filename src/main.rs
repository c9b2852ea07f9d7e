//! Codeagent: launcher for coding-agent CLIs with profile-based configuration.
//!
//! This is the main entry point for the `codeagent` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod exit_codes;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli.command) {
        Ok(code) => ExitCode::from(process_exit_code(code)),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Map a dispatch result to this process's exit code.
///
/// A negative code means the child died without one (killed by a signal);
/// that is a launch failure, never success.
fn process_exit_code(code: i32) -> u8 {
    if code < 0 {
        exit_codes::LAUNCH_FAILURE as u8
    } else {
        code.min(u8::MAX as i32) as u8
    }
}
