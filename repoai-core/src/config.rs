use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Immutable settings for every component, loaded once at start-up and
/// handed to each component when it is constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub workspace: WorkspaceSettings,
    pub llm: LlmSettings,
    pub github: GithubSettings,
    pub analysis: AnalysisSettings,
    pub terminal: TerminalSettings,
}

impl Settings {
    pub fn trace_loaded(&self) {
        info!(
            host = %self.server.host,
            port = self.server.port,
            workspace = %self.workspace.root.display(),
            model = %self.llm.model,
            llm_api_key_set = self.llm.api_key.is_some(),
            github_token_set = self.github.token.is_some(),
            "Loaded Settings"
        );
        debug!(
            analysis = ?self.analysis,
            terminal = ?self.terminal,
            cors_allowed_origins = ?self.server.cors_allowed_origins,
            "Settings loaded (non-secret detail)"
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Default working directory for commands and tree listings.
    pub root: PathBuf,
    /// Deletes are refused outside this directory. Falls back to `root`.
    pub delete_root: Option<PathBuf>,
}

impl WorkspaceSettings {
    pub fn delete_root(&self) -> &PathBuf {
        self.delete_root.as_ref().unwrap_or(&self.root)
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/workspaces"),
            delete_root: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    /// Full URL of the OpenAI-compatible chat-completions endpoint.
    pub endpoint: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

// Hand-written so the key never reaches a log line.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key_set", &self.api_key.is_some())
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama3-70b-8192".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub token: Option<String>,
    pub api_base: String,
    pub raw_base: String,
}

impl std::fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSettings")
            .field("token_set", &self.token.is_some())
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .finish()
    }
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Pause after each file sent to the LLM.
    pub file_delay_ms: u64,
    /// Files longer than this many characters are skipped.
    pub max_file_chars: usize,
    /// Used when a request does not set `max_files`.
    pub default_max_files: usize,
}

impl AnalysisSettings {
    pub fn file_delay(&self) -> Duration {
        Duration::from_millis(self.file_delay_ms)
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            file_delay_ms: 300,
            max_file_chars: 100_000,
            default_max_files: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
}

impl TerminalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_concurrent: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"analysis": {"file_delay_ms": 0}}"#).unwrap();
        assert_eq!(settings.analysis.file_delay_ms, 0);
        assert_eq!(settings.analysis.max_file_chars, 100_000);
        assert_eq!(settings.terminal.timeout_secs, 30);
        assert_eq!(settings.workspace.delete_root(), &PathBuf::from("/workspaces"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("gsk_secret".into());
        settings.github.token = Some("ghp_secret".into());
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret"), "{rendered}");
        assert!(rendered.contains("api_key_set: true"));
    }
}
