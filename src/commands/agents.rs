//! Implementation of the `agents` command.

use crate::config::{CONFIG_DIR_NAME, ConfigStore, store};
use crate::error::Result;
use std::io::Write;

/// List agent profiles from models.json plus dynamic agents found on disk.
pub fn cmd_agents() -> Result<i32> {
    let mut out = std::io::stdout();
    agents_with(store(), &mut out)
}

fn agents_with(store: &ConfigStore, out: &mut dyn Write) -> Result<i32> {
    let config = store.get()?;

    if config.agents.is_empty() {
        let _ = writeln!(out, "No agents configured.");
    } else {
        let _ = writeln!(out, "Configured agents:");
        for (name, agent) in &config.agents {
            let backend_name = {
                let backend = agent.backend.trim();
                if backend.is_empty() {
                    config.default_backend.as_str()
                } else {
                    backend
                }
            };
            let mut line = format!("  {name}  backend={backend_name}  model={}", agent.model);
            if !agent.description.is_empty() {
                line.push_str(&format!("  ({})", agent.description));
            }
            let _ = writeln!(out, "{line}");
        }
    }

    let dynamic = dynamic_agent_names(store)?;
    if !dynamic.is_empty() {
        let _ = writeln!(out, "Dynamic agents (~/{CONFIG_DIR_NAME}/agents):");
        for name in dynamic {
            if config.agents.contains_key(&name) {
                continue;
            }
            let _ = writeln!(out, "  {name}");
        }
    }

    Ok(crate::exit_codes::SUCCESS)
}

/// Names of `<name>.md` files under the dynamic agents directory, sorted.
fn dynamic_agent_names(store: &ConfigStore) -> Result<Vec<String>> {
    let dir = store.home_dir()?.join(CONFIG_DIR_NAME).join("agents");
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Ok(Vec::new());
    };

    let mut names = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
