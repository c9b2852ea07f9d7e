//! CLI argument parsing for codeagent.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Codeagent: launcher for coding-agent CLIs with profile-based configuration.
///
/// Agent profiles live in ~/.codeagent/models.json and bind a named agent to
/// a backend CLI (claude or codex), a model, credentials, and launch flags.
#[derive(Parser, Debug)]
#[command(name = "codeagent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for codeagent.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an agent on a task.
    ///
    /// Resolves the agent profile, injects backend credentials into the
    /// child environment, and launches the backend CLI with the task.
    Run(RunArgs),

    /// Run a batch of tasks in parallel.
    ///
    /// Reads task descriptors from a file, resolves all of them up front,
    /// and launches up to --max-parallel backends at a time.
    Parallel(ParallelArgs),

    /// List configured agents.
    ///
    /// Shows agent profiles from ~/.codeagent/models.json and dynamic
    /// agents found under ~/.codeagent/agents/.
    Agents,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Agent name to run (a profile in models.json or a dynamic agent).
    pub agent: String,

    /// Task text handed to the backend. Multiple words are joined.
    #[arg(required = true)]
    pub task: Vec<String>,

    /// Working directory for the backend process.
    #[arg(long)]
    pub workdir: Option<String>,

    /// Override the agent's backend for this run.
    #[arg(long)]
    pub backend: Option<String>,

    /// Show the command and env plan without launching anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `parallel` command.
#[derive(Parser, Debug)]
pub struct ParallelArgs {
    /// Path to the task descriptor file.
    pub file: String,

    /// Maximum number of backends running at once.
    #[arg(long, default_value_t = 4)]
    pub max_parallel: usize,

    /// Show the resolved commands without launching anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
