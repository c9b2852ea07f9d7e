//! Layered configuration for the codeagent wrapper.
//!
//! The models document at `~/.codeagent/models.json` declares process-wide
//! defaults, per-backend credential/model profiles, and named agent profiles.
//! This module owns loading it (once per process), resolving backends
//! case-insensitively, and merging the agent > backend > default layers into
//! launch parameters.

mod model;
mod resolver;
mod store;


pub use model::{AgentConfig, BackendConfig, ModelsConfig, Toggle};
pub use resolver::{
    ResolvedAgent, probe_dynamic_agent, resolve_agent, resolve_agent_with_backend,
    resolve_backend_runtime_defaults, resolve_backend_use_api, validate_agent_name,
};
pub use store::{
    CONFIG_DIR_NAME, ConfigStore, MODELS_CONFIG_TILDE_PATH, models_config_hint,
    reset_store_for_tests, store,
};
