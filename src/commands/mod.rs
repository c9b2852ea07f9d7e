//! Command implementations for codeagent.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod agents;
mod parallel;
mod run;

use crate::cli::Command;
use crate::error::Result;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function and returns the process exit code.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Parallel(args) => parallel::cmd_parallel(args),
        Command::Agents => agents::cmd_agents(),
    }
}
