//! Credential environment injection for backend processes.
//!
//! Decides which credential variables a child process receives and renders
//! the masked diagnostic lines. The child environment always gets the full
//! value; masking applies to log output only.

use crate::config::{ResolvedAgent, Toggle};

/// Fixed marker replacing the hidden middle of a masked secret.
pub const MASK_MARKER: &str = "****";

/// Backend families, each with its own fixed credential variable pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFamily {
    /// Anthropic-style CLIs.
    Claude,
    /// OpenAI-style CLIs (the default family).
    Codex,
}

impl BackendFamily {
    /// Classify a backend name. Names mentioning "claude" map to the Claude
    /// family; everything else is treated as codex-compatible.
    pub fn of(backend_name: &str) -> Self {
        if backend_name.trim().to_lowercase().contains("claude") {
            BackendFamily::Claude
        } else {
            BackendFamily::Codex
        }
    }

    pub fn base_url_var(self) -> &'static str {
        match self {
            BackendFamily::Claude => "ANTHROPIC_BASE_URL",
            BackendFamily::Codex => "OPENAI_BASE_URL",
        }
    }

    pub fn api_key_var(self) -> &'static str {
        match self {
            BackendFamily::Claude => "ANTHROPIC_API_KEY",
            BackendFamily::Codex => "OPENAI_API_KEY",
        }
    }
}

/// The environment decision for one launch: variables to set on the child
/// process and the diagnostic lines documenting the decision.
#[derive(Debug, Clone, Default)]
pub struct EnvPlan {
    pub vars: Vec<(String, String)>,
    pub log_lines: Vec<String>,
}

/// Render a secret for log output.
///
/// Secrets longer than 8 characters show their first and last 4 characters
/// around the mask marker; anything shorter is masked in full so no fragment
/// of a short secret ever reaches the logs.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return MASK_MARKER.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{MASK_MARKER}{tail}")
}

/// Decide credential injection for a resolved task.
///
/// Injection is suppressed entirely when the backend's `use_api` flag is
/// explicitly false; a diagnostic line names the condition so operators can
/// see why credentials were not passed. When the flag is true or unset,
/// whichever of base URL / API key are present get injected. Base URLs are
/// never secret and are logged unmasked.
pub fn plan_env(resolved: &ResolvedAgent, use_api: Toggle) -> EnvPlan {
    let mut plan = EnvPlan::default();

    if use_api.is_disabled() {
        plan.log_lines.push("use_api=false skip".to_string());
        return plan;
    }

    let family = BackendFamily::of(&resolved.backend);
    if !resolved.base_url.is_empty() {
        let name = family.base_url_var();
        plan.log_lines
            .push(format!("Env: {name}={}", resolved.base_url));
        plan.vars
            .push((name.to_string(), resolved.base_url.clone()));
    }
    if !resolved.api_key.is_empty() {
        let name = family.api_key_var();
        plan.log_lines
            .push(format!("Env: {name}={}", mask_secret(&resolved.api_key)));
        plan.vars.push((name.to_string(), resolved.api_key.clone()));
    }

    plan
}
