//! Task execution: env planning, backend launching, and parallel task
//! descriptor parsing.

pub mod env;
pub mod launch;
pub mod parallel;

pub use env::{BackendFamily, EnvPlan, mask_secret, plan_env};
pub use launch::{
    LaunchSpec, ProcessLauncher, SystemLauncher, build_backend_command, launch_task, plan_launch,
    render_command, resolve_backend_task,
};
pub use parallel::{ParallelConfig, TaskDescriptor, parse_parallel_config};
