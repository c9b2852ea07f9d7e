//! Implementation of the `parallel` command.
//!
//! Parses a task descriptor file, resolves every task before any launch
//! (one bad descriptor rejects the whole batch), then runs tasks on a
//! bounded worker pool.

use crate::cli::ParallelArgs;
use crate::config::{ConfigStore, ResolvedAgent, store};
use crate::error::{Result, WrapperError};
use crate::executor::{
    ProcessLauncher, SystemLauncher, TaskDescriptor, launch_task, parse_parallel_config,
    plan_launch, render_command,
};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One fully-resolved batch entry, ready to launch.
struct ResolvedTask {
    descriptor: TaskDescriptor,
    params: ResolvedAgent,
}

impl ResolvedTask {
    fn workdir(&self) -> Option<&str> {
        let dir = self.descriptor.workdir.trim();
        (!dir.is_empty()).then_some(dir)
    }
}

/// Parse, resolve, and run the batch. Returns the exit code to report.
pub fn cmd_parallel(args: ParallelArgs) -> Result<i32> {
    parallel_with(store(), &args, &SystemLauncher)
}

fn parallel_with(
    store: &ConfigStore,
    args: &ParallelArgs,
    launcher: &dyn ProcessLauncher,
) -> Result<i32> {
    let text = std::fs::read_to_string(&args.file).map_err(|err| {
        WrapperError::UserError(format!("failed to read task file '{}': {err}", args.file))
    })?;
    let config = parse_parallel_config(&text)?;

    // Resolve everything before launching anything.
    let tasks = resolve_batch(store, config.tasks)?;

    if args.dry_run {
        for task in &tasks {
            let (spec, plan) =
                plan_launch(store, &task.params, &task.descriptor.content, task.workdir())?;
            println!("Task {}:", task.descriptor.id);
            for line in &plan.log_lines {
                println!("  {line}");
            }
            if let Some(dir) = &spec.workdir {
                println!("  Workdir: {dir}");
            }
            println!("  {}", render_command(&spec));
        }
        return Ok(crate::exit_codes::SUCCESS);
    }

    run_batch(store, &tasks, args.max_parallel.max(1), launcher)
}

/// Resolve launch parameters for every descriptor, failing the whole batch
/// on the first error.
fn resolve_batch(store: &ConfigStore, descriptors: Vec<TaskDescriptor>) -> Result<Vec<ResolvedTask>> {
    descriptors
        .into_iter()
        .map(|descriptor| {
            // Prefix user errors with the task id; config errors pass through
            // so they keep their exit code and fix-it hint.
            let mut params = crate::executor::resolve_backend_task(store, &descriptor.backend)
                .map_err(|err| match err {
                    WrapperError::UserError(msg) => {
                        WrapperError::UserError(format!("task {:?}: {msg}", descriptor.id))
                    }
                    other => other,
                })?;
            let reasoning = descriptor.reasoning_effort.trim();
            if !reasoning.is_empty() {
                params.reasoning = reasoning.to_string();
            }
            Ok(ResolvedTask { descriptor, params })
        })
        .collect()
}

/// Run tasks on at most `max_parallel` worker threads. Each task's
/// diagnostics are buffered and flushed to stderr as a unit when it
/// finishes, so output from concurrent tasks does not interleave.
fn run_batch(
    store: &ConfigStore,
    tasks: &[ResolvedTask],
    max_parallel: usize,
    launcher: &dyn ProcessLauncher,
) -> Result<i32> {
    let next = AtomicUsize::new(0);
    let results: Vec<Mutex<Option<Result<i32>>>> =
        tasks.iter().map(|_| Mutex::new(None)).collect();
    let stderr = Mutex::new(std::io::stderr());

    std::thread::scope(|scope| {
        for _ in 0..max_parallel.min(tasks.len()) {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(task) = tasks.get(index) else {
                        break;
                    };

                    let mut diag = Vec::new();
                    let _ = writeln!(diag, "Task {} starting", task.descriptor.id);
                    let outcome = launch_task(
                        store,
                        &task.params,
                        &task.descriptor.content,
                        task.workdir(),
                        launcher,
                        &mut diag,
                    );
                    match &outcome {
                        Ok(code) => {
                            let _ =
                                writeln!(diag, "Task {} exited with {code}", task.descriptor.id);
                        }
                        Err(err) => {
                            let _ = writeln!(diag, "Task {} failed: {err}", task.descriptor.id);
                        }
                    }

                    let mut out = stderr.lock().unwrap();
                    let _ = out.write_all(&diag);
                    drop(out);

                    *results[index].lock().unwrap() = Some(outcome);
                }
            });
        }
    });

    let mut any_error = false;
    let mut any_nonzero = false;
    for slot in &results {
        match slot.lock().unwrap().take() {
            Some(Ok(0)) => {}
            Some(Ok(code)) if code > 0 => any_nonzero = true,
            // Negative codes mean the child died without one (signal).
            Some(Ok(_)) | Some(Err(_)) | None => any_error = true,
        }
    }

    if any_error {
        Ok(crate::exit_codes::LAUNCH_FAILURE)
    } else if any_nonzero {
        Ok(crate::exit_codes::USER_ERROR)
    } else {
        Ok(crate::exit_codes::SUCCESS)
    }
}
