/// `load_config`: builds the immutable [`Settings`] the server and CLI run with.
///
/// Sources, lowest precedence first:
/// 1. built-in defaults (every field of [`Settings`] has one),
/// 2. an optional YAML file with any of the `server`, `workspace`, `llm`,
///    `github`, `analysis` and `terminal` sections,
/// 3. environment variables (`GROQ_API_KEY`, `GITHUB_TOKEN`, `PORT`, `HOST`,
///    `WORKSPACE`, `LLM_MODEL`), typically populated from `.env` by `main`.
///
/// CLI flags are applied afterwards by [`crate::cli`].
///
/// Secrets belong in the environment; the YAML file may carry them but
/// should not be committed when it does.
use anyhow::Result;
use repoai_core::config::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match path {
        Some(path_ref) => read_yaml(path_ref)?,
        None => {
            info!("No config file given, starting from defaults");
            Settings::default()
        }
    };
    apply_env_overrides(&mut settings)?;
    // Blank secrets in YAML count as unset.
    settings.llm.api_key = settings.llm.api_key.filter(|k| !k.trim().is_empty());
    settings.github.token = settings.github.token.filter(|t| !t.trim().is_empty());
    Ok(settings)
}

fn read_yaml(path_ref: &Path) -> Result<Settings> {
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        return Ok(Settings::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(settings) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Non-empty environment variable, if set.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    if let Some(key) = env_var("GROQ_API_KEY") {
        settings.llm.api_key = Some(key);
    }
    if let Some(token) = env_var("GITHUB_TOKEN") {
        settings.github.token = Some(token);
    }
    if let Some(model) = env_var("LLM_MODEL") {
        settings.llm.model = model;
    }
    if let Some(host) = env_var("HOST") {
        settings.server.host = host;
    }
    if let Some(port) = env_var("PORT") {
        settings.server.port = match port.parse() {
            Ok(port) => port,
            Err(e) => {
                error!(error = ?e, port = %port, "PORT is not a valid port number");
                return Err(anyhow::anyhow!("Invalid PORT {port:?}: {e}"));
            }
        };
    }
    if let Some(workspace) = env_var("WORKSPACE") {
        settings.workspace.root = PathBuf::from(workspace);
    }
    Ok(())
}
