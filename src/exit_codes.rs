//! Exit code constants for the codeagent CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad agent name, malformed task document)
//! - 2: Configuration error (missing/invalid models document, resolution failure)
//! - 3: Launch failure (backend process could not be spawned or waited on)
//!
//! A backend that runs and exits non-zero is not a launch failure: `run`
//! forwards its exit code verbatim and `parallel` reports it as a user error.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid agent name, malformed task document.
pub const USER_ERROR: i32 = 1;

/// Configuration error: models document missing, unreadable, or defective.
pub const CONFIG_FAILURE: i32 = 2;

/// Launch failure: backend process could not be spawned or waited on, or
/// died without an exit code.
pub const LAUNCH_FAILURE: i32 = 3;
