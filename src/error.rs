//! Error types for the codeagent CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Every error that originates from the user-editable models document carries a
//! `hint` string (built by `config::store::models_config_hint`) embedding the
//! tilde-form path, the resolved path, and a literal example document, so the
//! user can fix the file without consulting documentation.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for codeagent operations.
///
/// Clone is required because the config store caches the first load result,
/// value or error, and replays it to every caller.
#[derive(Error, Debug, Clone)]
pub enum WrapperError {
    /// The user home directory could not be determined.
    #[error("failed to resolve user home directory\n\n{hint}")]
    HomeResolution { hint: String },

    /// The resolved config path escapes the expected config directory.
    #[error("refusing to read models config outside {dir}: {path}\n\n{hint}")]
    PathSafety {
        dir: String,
        path: String,
        hint: String,
    },

    /// The models document does not exist.
    #[error("models config not found: {path}\n\n{hint}")]
    ConfigNotFound { path: String, hint: String },

    /// The models document exists but could not be read.
    #[error("failed to read models config {path}: {reason}\n\n{hint}")]
    ConfigRead {
        path: String,
        reason: String,
        hint: String,
    },

    /// The models document is not valid JSON.
    #[error("failed to parse models config {path}: {reason}\n\n{hint}")]
    ConfigParse {
        path: String,
        reason: String,
        hint: String,
    },

    /// The agent name failed validation before any config or file access.
    #[error("invalid agent name {name:?}: {reason}")]
    InvalidAgentName { name: String, reason: String },

    /// An explicit agent has no backend and no default_backend is set.
    #[error("agent {agent:?} has empty backend and default_backend is not set\n\n{hint}")]
    MissingBackend { agent: String, hint: String },

    /// An explicit agent has no model. Explicit agents must declare a model;
    /// there is no backend-level fallback for them.
    #[error("agent {agent:?} has empty model; set agents.{agent}.model in the models config\n\n{hint}")]
    MissingModel { agent: String, hint: String },

    /// A dynamic agent needs both document defaults, and at least one is blank.
    #[error(
        "dynamic agent {agent:?} requires default_backend and default_model to be set\n\n{hint}"
    )]
    MissingDefaults { agent: String, hint: String },

    /// No explicit profile and no dynamic agent file for this name.
    #[error("agent {agent:?} not found\n\n{hint}")]
    AgentNotFound { agent: String, hint: String },

    /// The parallel task document is malformed.
    #[error("invalid parallel task document: {0}")]
    ParallelParse(String),

    /// Bad arguments or other user-correctable condition.
    #[error("{0}")]
    UserError(String),

    /// The backend process could not be started or driven.
    #[error("failed to launch backend: {0}")]
    Launch(String),
}

impl WrapperError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            WrapperError::InvalidAgentName { .. }
            | WrapperError::ParallelParse(_)
            | WrapperError::UserError(_) => exit_codes::USER_ERROR,
            WrapperError::HomeResolution { .. }
            | WrapperError::PathSafety { .. }
            | WrapperError::ConfigNotFound { .. }
            | WrapperError::ConfigRead { .. }
            | WrapperError::ConfigParse { .. }
            | WrapperError::MissingBackend { .. }
            | WrapperError::MissingModel { .. }
            | WrapperError::MissingDefaults { .. }
            | WrapperError::AgentNotFound { .. } => exit_codes::CONFIG_FAILURE,
            WrapperError::Launch(_) => exit_codes::LAUNCH_FAILURE,
        }
    }
}

/// Result type alias for codeagent operations.
pub type Result<T> = std::result::Result<T, WrapperError>;
