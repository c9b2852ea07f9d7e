//! Config store: location resolution and process-wide memoized loading of the
//! models document.
//!
//! The document lives at a fixed per-user path (`~/.codeagent/models.json`).
//! The first `get()` performs the load (read + parse + normalize) and every
//! later call replays the same cached value or error without re-reading the
//! file, even if it changes on disk. `reset()` re-arms the cache and exists
//! only for test isolation.

use crate::config::model::ModelsConfig;
use crate::error::{Result, WrapperError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

/// Tilde-form path shown in every user-facing diagnostic.
pub const MODELS_CONFIG_TILDE_PATH: &str = "~/.codeagent/models.json";

/// Per-user directory holding the models document and dynamic agent prompts.
pub const CONFIG_DIR_NAME: &str = ".codeagent";

const MODELS_FILE_NAME: &str = "models.json";

const MODELS_CONFIG_EXAMPLE: &str = r#"{
  "default_backend": "codex",
  "default_model": "gpt-4.1",
  "backends": {
    "codex": { "api_key": "...", "model": "gpt-4.1", "reasoning": "medium", "use_api": false },
    "claude": { "api_key": "...", "model": "claude-sonnet-4", "reasoning": "medium", "skip_permissions": false, "use_api": false }
  },
  "agents": {
    "develop": {
      "backend": "codex",
      "model": "gpt-4.1",
      "prompt_file": "~/.codeagent/prompts/develop.md",
      "reasoning": "high",
      "yolo": true
    }
  }
}"#;

/// Build the fix-it hint appended to every config-related error message.
///
/// Pure function of the resolved path so the message format can be tested
/// independently of the error kind. An empty `resolved` (secondary path
/// resolution failed) omits the resolved-path clause rather than masking the
/// primary error.
pub fn models_config_hint(resolved: &str) -> String {
    let resolved = resolved.trim();
    if resolved.is_empty() {
        format!("Create {MODELS_CONFIG_TILDE_PATH} with e.g.:\n{MODELS_CONFIG_EXAMPLE}")
    } else {
        format!(
            "Create {MODELS_CONFIG_TILDE_PATH} (resolved to {resolved}) with e.g.:\n{MODELS_CONFIG_EXAMPLE}"
        )
    }
}

type CachedLoad = Option<Result<Arc<ModelsConfig>>>;

/// Load-once cache for the models document.
///
/// Concurrent first callers block on the cache mutex until exactly one load
/// completes; afterwards every caller observes the identical cached result.
/// The cached document is read-only; no component mutates it in place.
pub struct ConfigStore {
    /// Overrides home-directory discovery, for tests.
    home: Option<PathBuf>,
    cache: Mutex<CachedLoad>,
}

impl ConfigStore {
    /// Store rooted at the real user home directory.
    pub fn new() -> Self {
        Self {
            home: None,
            cache: Mutex::new(None),
        }
    }

    /// Store rooted at an explicit home directory (test isolation).
    pub fn with_home<P: AsRef<Path>>(home: P) -> Self {
        Self {
            home: Some(home.as_ref().to_path_buf()),
            cache: Mutex::new(None),
        }
    }

    /// Resolve the user home directory.
    pub fn home_dir(&self) -> Result<PathBuf> {
        if let Some(home) = &self.home {
            return Ok(home.clone());
        }
        match dirs::home_dir() {
            Some(home) if !home.as_os_str().is_empty() => Ok(home),
            _ => Err(WrapperError::HomeResolution {
                hint: models_config_hint(""),
            }),
        }
    }

    /// Resolve and validate the models document path.
    ///
    /// The path is rebuilt from fixed components and verified to stay inside
    /// the config directory, so a compromised home-directory resolution cannot
    /// redirect the read elsewhere.
    pub fn models_path(&self) -> Result<PathBuf> {
        let config_dir = self.home_dir()?.join(CONFIG_DIR_NAME);
        let path = config_dir.join(MODELS_FILE_NAME);
        if !path.starts_with(&config_dir) || path.components().any(|c| c.as_os_str() == "..") {
            return Err(WrapperError::PathSafety {
                dir: config_dir.display().to_string(),
                path: path.display().to_string(),
                hint: models_config_hint(""),
            });
        }
        Ok(path)
    }

    /// Best-effort resolved path for embedding in diagnostics.
    ///
    /// A secondary path-resolution failure yields an empty string instead of
    /// masking the primary error being reported.
    pub fn models_path_display(&self) -> String {
        self.models_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    /// Read, parse, and normalize the models document. Uncached.
    pub fn load(&self) -> Result<Arc<ModelsConfig>> {
        let path = self.models_path()?;
        let display = path.display().to_string();

        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(WrapperError::ConfigNotFound {
                    hint: models_config_hint(&display),
                    path: display,
                });
            }
            Err(err) => {
                return Err(WrapperError::ConfigRead {
                    reason: err.to_string(),
                    hint: models_config_hint(&display),
                    path: display,
                });
            }
        };

        let mut config: ModelsConfig =
            serde_json::from_str(&data).map_err(|err| WrapperError::ConfigParse {
                reason: err.to_string(),
                hint: models_config_hint(&display),
                path: display.clone(),
            })?;
        config.normalize();
        Ok(Arc::new(config))
    }

    /// Cached load. Idempotent: the first call loads, every later call returns
    /// the same value or error for the lifetime of the store.
    pub fn get(&self) -> Result<Arc<ModelsConfig>> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.get_or_insert_with(|| self.load()).clone()
    }

    /// Clear the cached result so the next `get()` re-reads the file.
    ///
    /// Test isolation only; not meant for concurrent production use.
    pub fn reset(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        *cache = None;
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

static STORE: LazyLock<ConfigStore> = LazyLock::new(ConfigStore::new);

/// Process-wide config store rooted at the real user home directory.
pub fn store() -> &'static ConfigStore {
    &STORE
}

/// Re-arm the process-wide cache between isolated test runs.
pub fn reset_store_for_tests() {
    STORE.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_models(home: &Path, content: &str) {
        let dir = home.join(CONFIG_DIR_NAME);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MODELS_FILE_NAME), content).unwrap();
    }

    #[test]
    fn hint_mentions_tilde_path_and_example() {
        let hint = models_config_hint("");
        assert!(hint.contains(MODELS_CONFIG_TILDE_PATH));
        assert!(hint.contains("\"agents\""));
        assert!(!hint.contains("resolved to"));

        let hint = models_config_hint("/home/u/.codeagent/models.json");
        assert!(hint.contains("resolved to /home/u/.codeagent/models.json"));
    }

    #[test]
    fn missing_file_yields_not_found_with_both_paths() {
        let home = TempDir::new().unwrap();
        let store = ConfigStore::with_home(home.path());

        let err = store.get().unwrap_err();
        assert!(matches!(err, WrapperError::ConfigNotFound { .. }));
        let msg = err.to_string();
        assert!(msg.contains(MODELS_CONFIG_TILDE_PATH));
        let resolved = home
            .path()
            .join(CONFIG_DIR_NAME)
            .join(MODELS_FILE_NAME)
            .display()
            .to_string();
        assert!(msg.contains(&resolved), "missing resolved path in: {msg}");
        assert!(msg.contains("\"agents\""), "missing example in: {msg}");
    }

    #[test]
    fn unreadable_file_yields_read_error_with_both_paths() {
        let home = TempDir::new().unwrap();
        // models.json exists but is a directory, so the read fails with
        // something other than NotFound. This works regardless of the uid
        // running the tests, where a permission-bit test would not.
        let path = home.path().join(CONFIG_DIR_NAME).join(MODELS_FILE_NAME);
        std::fs::create_dir_all(&path).unwrap();
        let store = ConfigStore::with_home(home.path());

        let err = store.get().unwrap_err();
        assert!(matches!(err, WrapperError::ConfigRead { .. }), "got: {err}");
        let msg = err.to_string();
        assert!(msg.contains(MODELS_CONFIG_TILDE_PATH));
        assert!(
            msg.contains(&path.display().to_string()),
            "missing resolved path in: {msg}"
        );
        assert!(msg.contains("\"agents\""), "missing example in: {msg}");
    }

    #[test]
    fn invalid_json_yields_parse_error() {
        let home = TempDir::new().unwrap();
        write_models(home.path(), "invalid json {");
        let store = ConfigStore::with_home(home.path());

        let err = store.get().unwrap_err();
        assert!(matches!(err, WrapperError::ConfigParse { .. }));
        assert!(err.to_string().contains(MODELS_CONFIG_TILDE_PATH));
    }

    #[test]
    fn get_caches_first_result_across_disk_mutation() {
        let home = TempDir::new().unwrap();
        write_models(home.path(), r#"{"default_backend": "codex"}"#);
        let store = ConfigStore::with_home(home.path());

        let first = store.get().unwrap();
        assert_eq!(first.default_backend, "codex");

        write_models(home.path(), r#"{"default_backend": "claude"}"#);
        let second = store.get().unwrap();
        assert_eq!(second.default_backend, "codex", "cache must be stable");

        store.reset();
        let third = store.get().unwrap();
        assert_eq!(third.default_backend, "claude");
    }

    #[test]
    fn get_caches_errors_too() {
        let home = TempDir::new().unwrap();
        let store = ConfigStore::with_home(home.path());

        assert!(store.get().is_err());

        // Creating the file later does not unseat the cached error.
        write_models(home.path(), r#"{"default_backend": "codex"}"#);
        assert!(store.get().is_err());

        store.reset();
        assert!(store.get().is_ok());
    }

    #[test]
    fn load_normalizes_backend_keys() {
        let home = TempDir::new().unwrap();
        write_models(
            home.path(),
            r#"{"backends": {" Claude ": {"api_key": "k"}}}"#,
        );
        let store = ConfigStore::with_home(home.path());

        let cfg = store.get().unwrap();
        assert!(cfg.backends.contains_key("claude"));
    }

    #[test]
    fn concurrent_first_callers_observe_one_load() {
        let home = TempDir::new().unwrap();
        write_models(home.path(), r#"{"default_backend": "codex"}"#);
        let store = ConfigStore::with_home(home.path());

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| store.get())).collect();
            for handle in handles {
                let cfg = handle.join().unwrap().unwrap();
                assert_eq!(cfg.default_backend, "codex");
            }
        });
    }
}
