//! Agent resolution: the precedence engine merging agent, backend, and
//! document-default layers into one set of launch parameters.
//!
//! # Precedence
//!
//! Agent field > backend field > document default, applied per field through
//! `first_non_empty` so the rule lives in one place. Explicit agents must
//! declare their own model; dynamic agents (a bare `<name>.md` prompt file
//! under `~/.codeagent/agents/`) inherit both document defaults instead.

use crate::config::model::Toggle;
use crate::config::store::{ConfigStore, models_config_hint};
use crate::error::{Result, WrapperError};
use regex::Regex;
use std::sync::LazyLock;

static AGENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid agent name regex"));

/// Launch parameters produced by agent resolution.
///
/// String fields are trimmed and never absent; an empty string is the
/// "unset" sentinel downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAgent {
    pub backend: String,
    pub model: String,
    pub prompt_file: String,
    pub reasoning: String,
    pub base_url: String,
    pub api_key: String,
    pub yolo: bool,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
}

/// Validate an agent name before any config or filesystem access.
///
/// Rejects path separators and traversal sequences so the dynamic-agent probe
/// can never escape its directory.
pub fn validate_agent_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(WrapperError::InvalidAgentName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if name.contains("..") {
        return Err(WrapperError::InvalidAgentName {
            name: name.to_string(),
            reason: "name contains a path traversal sequence".to_string(),
        });
    }
    if !AGENT_NAME_RE.is_match(name) {
        return Err(WrapperError::InvalidAgentName {
            name: name.to_string(),
            reason: "name must start with a letter or digit and contain only letters, digits, '.', '_' and '-'"
                .to_string(),
        });
    }
    Ok(())
}

/// Probe for a dynamic agent: a file named `<name>.md` under the per-user
/// agents directory. Only existence matters; content is never read.
///
/// Returns the prompt-file path in tilde form. Any filesystem error (missing
/// home dir, stat failure, the path being a directory) means "not found" --
/// absence is a normal outcome, never a hard error.
pub fn probe_dynamic_agent(store: &ConfigStore, name: &str) -> Option<String> {
    if validate_agent_name(name).is_err() {
        return None;
    }
    let home = store.home_dir().ok()?;
    let path = home
        .join(crate::config::store::CONFIG_DIR_NAME)
        .join("agents")
        .join(format!("{name}.md"));
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Some(format!("~/.codeagent/agents/{name}.md")),
        _ => None,
    }
}

/// First non-empty value after trimming, or empty when every layer is blank.
fn first_non_empty<'a>(layers: &[&'a str]) -> &'a str {
    layers
        .iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Resolve an agent name into concrete launch parameters.
///
/// Resolution order: explicit profile from the models document, then dynamic
/// agent, then `AgentNotFound`. Config store errors propagate verbatim; they
/// already carry the fix-it hint.
pub fn resolve_agent(store: &ConfigStore, agent_name: &str) -> Result<ResolvedAgent> {
    resolve_agent_with_backend(store, agent_name, None)
}

/// Like `resolve_agent`, with an optional backend override taking precedence
/// over both the profile's backend and the document default. The override
/// participates in the merge, so backend-level credentials follow it.
pub fn resolve_agent_with_backend(
    store: &ConfigStore,
    agent_name: &str,
    backend_override: Option<&str>,
) -> Result<ResolvedAgent> {
    validate_agent_name(agent_name)?;
    let config = store.get()?;
    let backend_override = backend_override.unwrap_or("");

    if let Some(agent) = config.agents.get(agent_name) {
        let backend = first_non_empty(&[backend_override, &agent.backend, &config.default_backend])
            .to_string();
        if backend.is_empty() {
            return Err(WrapperError::MissingBackend {
                agent: agent_name.to_string(),
                hint: models_config_hint(&store.models_path_display()),
            });
        }

        let backend_cfg = config.resolve_backend(&backend);
        let base_url = first_non_empty(&[&agent.base_url, &backend_cfg.base_url]).to_string();
        let api_key = first_non_empty(&[&agent.api_key, &backend_cfg.api_key]).to_string();

        let model = agent.model.trim().to_string();
        if model.is_empty() {
            return Err(WrapperError::MissingModel {
                agent: agent_name.to_string(),
                hint: models_config_hint(&store.models_path_display()),
            });
        }

        return Ok(ResolvedAgent {
            backend,
            model,
            prompt_file: agent.prompt_file.trim().to_string(),
            reasoning: agent.reasoning.trim().to_string(),
            base_url,
            api_key,
            yolo: agent.yolo,
            allowed_tools: agent.allowed_tools.clone(),
            disallowed_tools: agent.disallowed_tools.clone(),
        });
    }

    if let Some(prompt_file) = probe_dynamic_agent(store, agent_name) {
        let backend =
            first_non_empty(&[backend_override, &config.default_backend]).to_string();
        let model = config.default_model.trim().to_string();
        if backend.is_empty() || model.is_empty() {
            return Err(WrapperError::MissingDefaults {
                agent: agent_name.to_string(),
                hint: models_config_hint(&store.models_path_display()),
            });
        }
        let backend_cfg = config.resolve_backend(&backend);
        return Ok(ResolvedAgent {
            backend,
            model,
            prompt_file,
            base_url: backend_cfg.base_url.trim().to_string(),
            api_key: backend_cfg.api_key.trim().to_string(),
            ..Default::default()
        });
    }

    Err(WrapperError::AgentNotFound {
        agent: agent_name.to_string(),
        hint: models_config_hint(&store.models_path_display()),
    })
}

/// Backend-level `use_api` flag, `Unset` when the document cannot be loaded.
pub fn resolve_backend_use_api(store: &ConfigStore, backend_name: &str) -> Toggle {
    store
        .get()
        .map(|config| config.resolve_backend(backend_name).use_api)
        .unwrap_or_default()
}

/// Backend-level runtime defaults: model, reasoning, and skip-permissions.
pub fn resolve_backend_runtime_defaults(
    store: &ConfigStore,
    backend_name: &str,
) -> (String, String, Toggle) {
    match store.get() {
        Ok(config) => {
            let backend = config.resolve_backend(backend_name);
            (
                backend.model.trim().to_string(),
                backend.reasoning.trim().to_string(),
                backend.skip_permissions,
            )
        }
        Err(_) => (String::new(), String::new(), Toggle::Unset),
    }
}
