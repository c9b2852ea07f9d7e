//! Implementation of the `run` command.

use crate::cli::RunArgs;
use crate::config::{ConfigStore, resolve_agent_with_backend, store};
use crate::error::Result;
use crate::executor::{ProcessLauncher, SystemLauncher, launch_task, plan_launch, render_command};
use std::io::Write;

/// Resolve the agent and launch (or, with --dry-run, print) the backend
/// command. Returns the exit code to report.
pub fn cmd_run(args: RunArgs) -> Result<i32> {
    run_with(store(), &args, &SystemLauncher, &mut std::io::stderr())
}

fn run_with(
    store: &ConfigStore,
    args: &RunArgs,
    launcher: &dyn ProcessLauncher,
    diag: &mut dyn Write,
) -> Result<i32> {
    let params = resolve_agent_with_backend(store, &args.agent, args.backend.as_deref())?;
    let task_text = args.task.join(" ");

    if args.dry_run {
        let (spec, plan) = plan_launch(store, &params, &task_text, args.workdir.as_deref())?;
        for line in &plan.log_lines {
            println!("{line}");
        }
        if let Some(dir) = &spec.workdir {
            println!("Workdir: {dir}");
        }
        println!("{}", render_command(&spec));
        return Ok(crate::exit_codes::SUCCESS);
    }

    launch_task(
        store,
        &params,
        &task_text,
        args.workdir.as_deref(),
        launcher,
        diag,
    )
}
