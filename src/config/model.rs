//! Models document schema.
//!
//! Defines the `~/.codeagent/models.json` format: process-wide defaults, a
//! backend map, and an agent map. Unknown JSON fields are ignored for forward
//! compatibility.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Three-valued flag for settings that can be inherited from a parent layer.
///
/// `Unset` means "not specified here, defer to the layer below"; it is distinct
/// from both `Enabled` and `Disabled`. In JSON the flag is an optional bool:
/// absent or null maps to `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl Toggle {
    pub fn is_unset(&self) -> bool {
        matches!(self, Toggle::Unset)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Toggle::Disabled)
    }
}

impl<'de> Deserialize<'de> for Toggle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<bool>::deserialize(deserializer)? {
            None => Toggle::Unset,
            Some(true) => Toggle::Enabled,
            Some(false) => Toggle::Disabled,
        })
    }
}

impl Serialize for Toggle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Toggle::Unset => serializer.serialize_none(),
            Toggle::Enabled => serializer.serialize_bool(true),
            Toggle::Disabled => serializer.serialize_bool(false),
        }
    }
}

/// Per-backend defaults: credentials, model, and permission flags.
///
/// All fields are optional; an empty string means "absent" for the string
/// fields, and `Toggle::Unset` means "absent" for the flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub reasoning: String,

    /// Skip the backend's interactive permission prompts.
    #[serde(skip_serializing_if = "Toggle::is_unset")]
    pub skip_permissions: Toggle,

    /// Drive the backend through its API credentials rather than its own login.
    /// Explicitly false suppresses credential env injection entirely.
    #[serde(skip_serializing_if = "Toggle::is_unset")]
    pub use_api: Toggle,
}

/// A named agent profile layered on top of a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Backend to launch. Blank falls back to the document default_backend.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub backend: String,

    /// Model name. Required for explicit agents; resolution fails when blank.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub prompt_file: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Skip all confirmation prompts when launching the backend.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub yolo: bool,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub reasoning: String,

    /// Overrides the backend's base URL when non-empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,

    /// Overrides the backend's API key when non-empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disallowed_tools: Vec<String>,
}

/// Root of the models document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_backend: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_model: String,

    /// Backend profiles. Keys are normalized to lowercase after load.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub backends: BTreeMap<String, BackendConfig>,

    /// Agent profiles keyed by agent name (case-sensitive).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, AgentConfig>,
}

impl ModelsConfig {
    /// Normalize the document after parse: trim defaults, lowercase and trim
    /// backend keys, dropping keys that trim to empty.
    pub fn normalize(&mut self) {
        self.default_backend = self.default_backend.trim().to_string();
        self.default_model = self.default_model.trim().to_string();

        if !self.backends.is_empty() {
            let mut normalized = BTreeMap::new();
            for (key, backend) in std::mem::take(&mut self.backends) {
                let key = key.trim().to_lowercase();
                if key.is_empty() {
                    continue;
                }
                normalized.insert(key, backend);
            }
            self.backends = normalized;
        }
    }

    /// Look up a backend profile by name, case-insensitively.
    ///
    /// A blank name falls back to the document default_backend. A miss yields
    /// a zero-valued profile; this function never fails.
    pub fn resolve_backend(&self, backend_name: &str) -> BackendConfig {
        let mut key = backend_name.trim().to_lowercase();
        if key.is_empty() {
            key = self.default_backend.trim().to_lowercase();
        }
        if key.is_empty() {
            return BackendConfig::default();
        }
        self.backends.get(&key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_deserializes_from_optional_bool() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default)]
            flag: Toggle,
        }

        let p: Probe = serde_json::from_str(r#"{"flag": true}"#).unwrap();
        assert_eq!(p.flag, Toggle::Enabled);

        let p: Probe = serde_json::from_str(r#"{"flag": false}"#).unwrap();
        assert_eq!(p.flag, Toggle::Disabled);

        let p: Probe = serde_json::from_str(r#"{"flag": null}"#).unwrap();
        assert_eq!(p.flag, Toggle::Unset);

        let p: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(p.flag, Toggle::Unset);
    }

    #[test]
    fn normalize_lowercases_backend_keys_and_drops_empty() {
        let mut cfg: ModelsConfig = serde_json::from_str(
            r#"{
                "default_backend": " codex ",
                "default_model": " gpt-4.1 ",
                "backends": {
                    " Claude ": { "api_key": "k1" },
                    "CODEX": { "api_key": "k2" },
                    "   ": { "api_key": "dropped" }
                }
            }"#,
        )
        .unwrap();
        cfg.normalize();

        assert_eq!(cfg.default_backend, "codex");
        assert_eq!(cfg.default_model, "gpt-4.1");
        assert_eq!(cfg.backends.len(), 2);
        assert!(cfg.backends.contains_key("claude"));
        assert!(cfg.backends.contains_key("codex"));
    }

    #[test]
    fn resolve_backend_is_case_insensitive() {
        let mut cfg: ModelsConfig = serde_json::from_str(
            r#"{"backends": {"Claude": {"base_url": "https://backend.example"}}}"#,
        )
        .unwrap();
        cfg.normalize();

        for name in ["claude", "Claude", "CLAUDE", " claude "] {
            assert_eq!(
                cfg.resolve_backend(name).base_url,
                "https://backend.example",
                "lookup for {name:?}"
            );
        }
    }

    #[test]
    fn resolve_backend_blank_name_uses_default() {
        let mut cfg: ModelsConfig = serde_json::from_str(
            r#"{
                "default_backend": "codex",
                "backends": {"codex": {"model": "gpt-4.1", "reasoning": "high"}}
            }"#,
        )
        .unwrap();
        cfg.normalize();

        let backend = cfg.resolve_backend("");
        assert_eq!(backend.model, "gpt-4.1");
        assert_eq!(backend.reasoning, "high");
    }

    #[test]
    fn resolve_backend_miss_yields_zero_profile() {
        let cfg = ModelsConfig::default();
        let backend = cfg.resolve_backend("anything");
        assert!(backend.base_url.is_empty());
        assert!(backend.api_key.is_empty());
        assert!(backend.use_api.is_unset());
        assert!(backend.skip_permissions.is_unset());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let cfg: ModelsConfig = serde_json::from_str(
            r#"{
                "default_backend": "codex",
                "future_setting": {"nested": true},
                "agents": {"a": {"backend": "codex", "model": "m", "future": 1}}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.default_backend, "codex");
        assert_eq!(cfg.agents["a"].model, "m");
    }
}
