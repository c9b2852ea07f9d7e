//! Backend process launching.
//!
//! The core never spawns processes directly: it builds a `LaunchSpec` (program,
//! args, env overlay, working directory) and drives a `ProcessLauncher`.
//! `SystemLauncher` is the production implementation on `std::process`; tests
//! substitute a recording fake.

use crate::config::{
    ConfigStore, ResolvedAgent, Toggle, resolve_backend_runtime_defaults, resolve_backend_use_api,
};
use crate::error::{Result, WrapperError};
use crate::executor::env::{BackendFamily, EnvPlan, plan_env};
use std::io::Write;
use std::process::Command;

/// Everything needed to start one backend process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Environment overlay; the child inherits the parent env plus these.
    pub env: Vec<(String, String)>,
    pub workdir: Option<String>,
}

/// Process-launch collaborator: starts the program, wires its standard
/// streams through to the terminal, waits for completion, and reports the
/// exit code. Implementations must be safe to drive from concurrent launch
/// attempts.
pub trait ProcessLauncher: Sync {
    fn launch(&self, spec: &LaunchSpec) -> Result<i32>;
}

/// Launcher backed by `std::process::Command` with inherited stdio.
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<i32> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        for (name, value) in &spec.env {
            command.env(name, value);
        }
        if let Some(dir) = &spec.workdir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|err| {
            WrapperError::Launch(format!(
                "failed to execute '{}': {}\n\
                 Fix: ensure the backend CLI is installed and in PATH.",
                spec.program, err
            ))
        })?;
        let status = child.wait().map_err(|err| {
            WrapperError::Launch(format!("failed to wait for '{}': {}", spec.program, err))
        })?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// Expand a leading `~` or `~/` against the store's home directory.
fn expand_tilde(store: &ConfigStore, path: &str) -> Result<String> {
    if path == "~" {
        return Ok(store.home_dir()?.display().to_string());
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(store.home_dir()?.join(rest).display().to_string());
    }
    Ok(path.to_string())
}

/// Assemble the prompt handed to the backend: the agent's prompt file content
/// (when configured) followed by the task text.
fn assemble_prompt(store: &ConfigStore, params: &ResolvedAgent, task_text: &str) -> Result<String> {
    if params.prompt_file.is_empty() {
        return Ok(task_text.to_string());
    }
    let path = expand_tilde(store, &params.prompt_file)?;
    let prompt = std::fs::read_to_string(&path).map_err(|err| {
        WrapperError::UserError(format!("failed to read prompt file '{path}': {err}"))
    })?;
    Ok(format!("{}\n\n{}", prompt.trim_end(), task_text))
}

/// Build the backend command line for a resolved task.
///
/// `reasoning` is the effective reasoning level (agent over backend) and
/// `skip_permissions` the backend-level flag; the agent's yolo flag also
/// forces permission skipping.
pub fn build_backend_command(
    params: &ResolvedAgent,
    prompt: &str,
    reasoning: &str,
    skip_permissions: Toggle,
) -> LaunchSpec {
    match BackendFamily::of(&params.backend) {
        BackendFamily::Claude => {
            let mut args = vec![
                "-p".to_string(),
                prompt.to_string(),
                "--model".to_string(),
                params.model.clone(),
            ];
            if params.yolo || skip_permissions == Toggle::Enabled {
                args.push("--dangerously-skip-permissions".to_string());
            }
            if !params.allowed_tools.is_empty() {
                args.push("--allowedTools".to_string());
                args.push(params.allowed_tools.join(","));
            }
            if !params.disallowed_tools.is_empty() {
                args.push("--disallowedTools".to_string());
                args.push(params.disallowed_tools.join(","));
            }
            LaunchSpec {
                program: "claude".to_string(),
                args,
                ..Default::default()
            }
        }
        BackendFamily::Codex => {
            let mut args = vec![
                "exec".to_string(),
                prompt.to_string(),
                "--model".to_string(),
                params.model.clone(),
            ];
            if !reasoning.is_empty() {
                args.push("-c".to_string());
                args.push(format!("model_reasoning_effort={reasoning}"));
            }
            if params.yolo {
                args.push("--full-auto".to_string());
            }
            LaunchSpec {
                program: "codex".to_string(),
                args,
                ..Default::default()
            }
        }
    }
}

/// Render a launch spec as a copy-pasteable command line.
pub fn render_command(spec: &LaunchSpec) -> String {
    let mut parts = vec![spec.program.clone()];
    parts.extend(spec.args.iter().cloned());
    shell_words::join(&parts)
}

/// Resolve launch parameters for a parallel task that names a backend but no
/// agent profile: model and reasoning come from the backend profile with the
/// document defaults as fallback, credentials from the backend profile.
pub fn resolve_backend_task(store: &ConfigStore, backend_name: &str) -> Result<ResolvedAgent> {
    let config = store.get()?;
    let backend_cfg = config.resolve_backend(backend_name);

    let backend = {
        let name = backend_name.trim();
        if name.is_empty() {
            config.default_backend.clone()
        } else {
            name.to_string()
        }
    };

    let model = {
        let own = backend_cfg.model.trim();
        if own.is_empty() {
            config.default_model.trim()
        } else {
            own
        }
    };
    if model.is_empty() {
        return Err(WrapperError::UserError(format!(
            "backend {backend:?} resolves to no model; set backends.{backend}.model or default_model in {}",
            crate::config::MODELS_CONFIG_TILDE_PATH
        )));
    }

    Ok(ResolvedAgent {
        backend,
        model: model.to_string(),
        reasoning: backend_cfg.reasoning.trim().to_string(),
        base_url: backend_cfg.base_url.trim().to_string(),
        api_key: backend_cfg.api_key.trim().to_string(),
        ..Default::default()
    })
}

/// Resolve gating and permission flags, assemble the prompt, and build the
/// full launch spec plus its env plan, without launching anything.
pub fn plan_launch(
    store: &ConfigStore,
    params: &ResolvedAgent,
    task_text: &str,
    workdir: Option<&str>,
) -> Result<(LaunchSpec, EnvPlan)> {
    let use_api = resolve_backend_use_api(store, &params.backend);
    let (_, backend_reasoning, skip_permissions) =
        resolve_backend_runtime_defaults(store, &params.backend);

    let plan = plan_env(params, use_api);
    let prompt = assemble_prompt(store, params, task_text)?;
    let reasoning = if params.reasoning.is_empty() {
        backend_reasoning.as_str()
    } else {
        params.reasoning.as_str()
    };

    let mut spec = build_backend_command(params, &prompt, reasoning, skip_permissions);
    spec.env = plan.vars.clone();
    spec.workdir = workdir.map(str::to_string);
    Ok((spec, plan))
}

/// Plan the launch, write the env diagnostic lines, and drive the launcher.
/// Returns the child exit code. Safe to call from many concurrent launch
/// attempts.
pub fn launch_task(
    store: &ConfigStore,
    params: &ResolvedAgent,
    task_text: &str,
    workdir: Option<&str>,
    launcher: &dyn ProcessLauncher,
    diag: &mut dyn Write,
) -> Result<i32> {
    let (spec, plan) = plan_launch(store, params, task_text, workdir)?;
    for line in &plan.log_lines {
        let _ = writeln!(diag, "{line}");
    }
    launcher.launch(&spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_agent;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every spec it is asked to launch; never spawns anything.
    struct FakeLauncher {
        launched: Mutex<Vec<LaunchSpec>>,
        exit_code: i32,
    }

    impl FakeLauncher {
        fn new() -> Self {
            Self {
                launched: Mutex::new(Vec::new()),
                exit_code: 0,
            }
        }

        fn specs(&self) -> Vec<LaunchSpec> {
            self.launched.lock().unwrap().clone()
        }
    }

    impl ProcessLauncher for FakeLauncher {
        fn launch(&self, spec: &LaunchSpec) -> Result<i32> {
            self.launched.lock().unwrap().push(spec.clone());
            Ok(self.exit_code)
        }
    }

    fn write_models(home: &Path, content: &str) {
        let dir = home.join(crate::config::CONFIG_DIR_NAME);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("models.json"), content).unwrap();
    }

    #[test]
    fn claude_command_includes_permission_and_tool_flags() {
        let params = ResolvedAgent {
            backend: "claude".to_string(),
            model: "claude-sonnet-4".to_string(),
            yolo: true,
            allowed_tools: vec!["Read".to_string(), "Bash".to_string()],
            disallowed_tools: vec!["WebSearch".to_string()],
            ..Default::default()
        };

        let spec = build_backend_command(&params, "do it", "", Toggle::Unset);
        assert_eq!(spec.program, "claude");
        assert_eq!(spec.args[..4], ["-p", "do it", "--model", "claude-sonnet-4"]);
        assert!(spec.args.contains(&"--dangerously-skip-permissions".to_string()));
        let allowed_at = spec.args.iter().position(|a| a == "--allowedTools").unwrap();
        assert_eq!(spec.args[allowed_at + 1], "Read,Bash");
        let disallowed_at = spec
            .args
            .iter()
            .position(|a| a == "--disallowedTools")
            .unwrap();
        assert_eq!(spec.args[disallowed_at + 1], "WebSearch");
    }

    #[test]
    fn claude_backend_skip_permissions_flag_also_applies() {
        let params = ResolvedAgent {
            backend: "claude".to_string(),
            model: "m".to_string(),
            ..Default::default()
        };
        let spec = build_backend_command(&params, "t", "", Toggle::Enabled);
        assert!(spec.args.contains(&"--dangerously-skip-permissions".to_string()));

        let spec = build_backend_command(&params, "t", "", Toggle::Disabled);
        assert!(!spec.args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn codex_command_includes_reasoning_and_full_auto() {
        let params = ResolvedAgent {
            backend: "codex".to_string(),
            model: "gpt-4.1".to_string(),
            yolo: true,
            ..Default::default()
        };

        let spec = build_backend_command(&params, "do it", "high", Toggle::Unset);
        assert_eq!(spec.program, "codex");
        assert_eq!(spec.args[..4], ["exec", "do it", "--model", "gpt-4.1"]);
        let c_at = spec.args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(spec.args[c_at + 1], "model_reasoning_effort=high");
        assert!(spec.args.contains(&"--full-auto".to_string()));
    }

    #[test]
    fn render_command_quotes_arguments() {
        let spec = LaunchSpec {
            program: "claude".to_string(),
            args: vec!["-p".to_string(), "two words".to_string()],
            ..Default::default()
        };
        assert_eq!(render_command(&spec), "claude -p 'two words'");
    }

    #[test]
    fn launch_task_injects_env_and_masks_key_in_diagnostics() {
        let home = TempDir::new().unwrap();
        let base_url = "https://api.minimaxi.com/anthropic";
        let api_key = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.test";
        write_models(
            home.path(),
            &format!(
                r#"{{
                    "agents": {{
                        "explore": {{
                            "backend": "claude",
                            "model": "MiniMax-M2.1",
                            "base_url": "{base_url}",
                            "api_key": "{api_key}"
                        }}
                    }}
                }}"#
            ),
        );
        let store = ConfigStore::with_home(home.path());
        let params = resolve_agent(&store, "explore").unwrap();

        let launcher = FakeLauncher::new();
        let mut diag = Vec::new();
        let code = launch_task(&store, &params, "hi", Some("."), &launcher, &mut diag).unwrap();
        assert_eq!(code, 0);

        let specs = launcher.specs();
        assert_eq!(specs.len(), 1);
        let env = &specs[0].env;
        assert!(env.contains(&("ANTHROPIC_BASE_URL".to_string(), base_url.to_string())));
        assert!(env.contains(&("ANTHROPIC_API_KEY".to_string(), api_key.to_string())));
        assert_eq!(specs[0].workdir.as_deref(), Some("."));

        let diag = String::from_utf8(diag).unwrap();
        assert!(diag.contains(&format!("Env: ANTHROPIC_BASE_URL={base_url}")));
        assert!(diag.contains("Env: ANTHROPIC_API_KEY=eyJh****test"));
        assert!(!diag.contains(api_key), "raw key leaked to diagnostics");
    }

    #[test]
    fn launch_task_suppresses_env_when_use_api_false() {
        let home = TempDir::new().unwrap();
        write_models(
            home.path(),
            r#"{
                "backends": {
                    "claude": {
                        "base_url": "https://api.minimaxi.com/anthropic",
                        "api_key": "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.test",
                        "use_api": false
                    }
                },
                "agents": {
                    "explore": {
                        "backend": "claude",
                        "model": "MiniMax-M2.1",
                        "base_url": "https://api.minimaxi.com/anthropic",
                        "api_key": "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.test"
                    }
                }
            }"#,
        );
        let store = ConfigStore::with_home(home.path());
        let params = resolve_agent(&store, "explore").unwrap();

        let launcher = FakeLauncher::new();
        let mut diag = Vec::new();
        launch_task(&store, &params, "hi", None, &launcher, &mut diag).unwrap();

        let specs = launcher.specs();
        assert!(
            specs[0].env.is_empty(),
            "credentials must not be injected when use_api=false"
        );
        let diag = String::from_utf8(diag).unwrap();
        assert!(diag.contains("use_api=false"));
    }

    #[test]
    fn launch_task_prepends_prompt_file_content() {
        let home = TempDir::new().unwrap();
        let prompts = home.path().join(crate::config::CONFIG_DIR_NAME).join("prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(prompts.join("develop.md"), "You are a developer.\n").unwrap();
        write_models(
            home.path(),
            r#"{
                "agents": {
                    "develop": {
                        "backend": "codex",
                        "model": "gpt-4.1",
                        "prompt_file": "~/.codeagent/prompts/develop.md"
                    }
                }
            }"#,
        );
        let store = ConfigStore::with_home(home.path());
        let params = resolve_agent(&store, "develop").unwrap();

        let launcher = FakeLauncher::new();
        let mut diag = Vec::new();
        launch_task(&store, &params, "Fix the bug.", None, &launcher, &mut diag).unwrap();

        let specs = launcher.specs();
        assert_eq!(specs[0].args[1], "You are a developer.\n\nFix the bug.");
    }

    #[test]
    fn launch_task_missing_prompt_file_is_user_error() {
        let home = TempDir::new().unwrap();
        write_models(
            home.path(),
            r#"{
                "agents": {
                    "develop": {
                        "backend": "codex",
                        "model": "gpt-4.1",
                        "prompt_file": "~/.codeagent/prompts/missing.md"
                    }
                }
            }"#,
        );
        let store = ConfigStore::with_home(home.path());
        let params = resolve_agent(&store, "develop").unwrap();

        let launcher = FakeLauncher::new();
        let mut diag = Vec::new();
        let err = launch_task(&store, &params, "t", None, &launcher, &mut diag).unwrap_err();
        assert!(matches!(err, WrapperError::UserError(_)));
        assert!(err.to_string().contains("missing.md"));
        assert!(launcher.specs().is_empty());
    }

    #[test]
    fn resolve_backend_task_uses_backend_then_document_defaults() {
        let home = TempDir::new().unwrap();
        write_models(
            home.path(),
            r#"{
                "default_backend": "codex",
                "default_model": "gpt-4.1",
                "backends": {
                    "claude": { "model": "claude-sonnet-4", "api_key": "k", "reasoning": "medium" }
                }
            }"#,
        );
        let store = ConfigStore::with_home(home.path());

        let claude = resolve_backend_task(&store, "claude").unwrap();
        assert_eq!(claude.model, "claude-sonnet-4");
        assert_eq!(claude.reasoning, "medium");
        assert_eq!(claude.api_key, "k");

        // Backend with no profile falls back to the document default model.
        let codex = resolve_backend_task(&store, "codex").unwrap();
        assert_eq!(codex.model, "gpt-4.1");
    }

    #[test]
    fn resolve_backend_task_without_any_model_fails() {
        let home = TempDir::new().unwrap();
        write_models(home.path(), r#"{"backends": {"codex": {}}}"#);
        let store = ConfigStore::with_home(home.path());

        let err = resolve_backend_task(&store, "codex").unwrap_err();
        assert!(err.to_string().contains("no model"));
    }
}
