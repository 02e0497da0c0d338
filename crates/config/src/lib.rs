//! Configuration loading, validation, and management for EVOS.
//!
//! Loads configuration from `~/.evos/config.toml` with `EVOS_*`
//! environment variable overrides. Validates all settings at startup.

use evos_core::Mode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.evos/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which engine to try first at startup
    #[serde(default = "default_mode")]
    pub ai_mode: Mode,

    /// Local inference daemon settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Remote API settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,
}

fn default_mode() -> Mode {
    Mode::Remote
}
fn default_request_timeout() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_local_model")]
    pub default_model: String,

    /// Used when `default_model` is not installed
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_local_model() -> String {
    "llama3.2:3b".into()
}
fn default_fallback_model() -> String {
    "llama3.2:1b".into()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            default_model: default_local_model(),
            fallback_model: default_fallback_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_remote_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_remote_model() -> String {
    "gemini-2.0-flash-exp".into()
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_remote_model(),
            embedding_model: default_embedding_model(),
            base_url: default_gemini_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Step budget per task
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Sampling temperature for ReAct steps (low favors deterministic tool choice)
    #[serde(default = "default_agent_temperature")]
    pub temperature: f32,

    /// Output-token budget per step
    #[serde(default = "default_agent_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_summary_chars")]
    pub content_summary_chars: usize,

    #[serde(default = "default_max_elements")]
    pub max_interactive_elements: usize,

    /// The action that ends a task with a user-facing result
    #[serde(default = "default_terminal_action")]
    pub terminal_action: String,
}

fn default_max_steps() -> u32 {
    10
}
fn default_agent_temperature() -> f32 {
    0.3
}
fn default_agent_max_tokens() -> u32 {
    1024
}
fn default_summary_chars() -> usize {
    2000
}
fn default_max_elements() -> usize {
    30
}
fn default_terminal_action() -> String {
    "answer_user".into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            temperature: default_agent_temperature(),
            max_tokens: default_agent_max_tokens(),
            content_summary_chars: default_summary_chars(),
            max_interactive_elements: default_max_elements(),
            terminal_action: default_terminal_action(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.evos/config.toml).
    ///
    /// Environment variables override the file:
    /// - `EVOS_AI_MODE`, `EVOS_OLLAMA_HOST`, `EVOS_DEFAULT_MODEL`,
    ///   `EVOS_FALLBACK_MODEL`, `EVOS_MAX_AGENT_STEPS`
    /// - `EVOS_GEMINI_API_KEY`, then `GEMINI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("EVOS_AI_MODE") {
            self.ai_mode = mode.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Some(host) = lookup("EVOS_OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(model) = lookup("EVOS_DEFAULT_MODEL") {
            self.ollama.default_model = model;
        }
        if let Some(model) = lookup("EVOS_FALLBACK_MODEL") {
            self.ollama.fallback_model = model;
        }
        if let Some(steps) = lookup("EVOS_MAX_AGENT_STEPS") {
            self.agent.max_steps = steps.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "EVOS_MAX_AGENT_STEPS must be a positive integer, got '{steps}'"
                ))
            })?;
        }
        if let Some(key) = lookup("EVOS_GEMINI_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.gemini.api_key = Some(key);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".evos")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tokens must be at least 1".into(),
            ));
        }

        if self.agent.terminal_action.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.terminal_action must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if a remote API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.gemini.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_mode: default_mode(),
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
            agent: AgentSettings::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for evos_core::Error {
    fn from(e: ConfigError) -> Self {
        evos_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.ai_mode, Mode::Remote);
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.agent.terminal_action, "answer_user");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.ai_mode, config.ai_mode);
        assert_eq!(parsed.ollama.default_model, config.ollama.default_model);
        assert_eq!(parsed.agent.max_tokens, config.agent.max_tokens);
    }

    #[test]
    fn legacy_mode_names_accepted() {
        let config: AppConfig = toml::from_str(r#"ai_mode = "offline""#).unwrap();
        assert_eq!(config.ai_mode, Mode::Local);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[ollama]
default_model = "qwen2.5:7b"

[agent]
max_steps = 4
"#,
        )
        .unwrap();
        assert_eq!(config.ollama.default_model, "qwen2.5:7b");
        assert_eq!(config.ollama.fallback_model, "llama3.2:1b");
        assert_eq!(config.agent.max_steps, 4);
        assert!((config.agent.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.agent.temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.terminal_action = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().agent.max_steps, 10);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ai_mode = \"local\"\n[gemini]\napi_key = \"k\"\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.ai_mode, Mode::Local);
        assert!(config.has_api_key());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "ai_mode = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("EVOS_AI_MODE", "offline"),
                ("EVOS_OLLAMA_HOST", "http://10.0.0.2:11434"),
                ("EVOS_MAX_AGENT_STEPS", "3"),
                ("GEMINI_API_KEY", "from-generic"),
            ]))
            .unwrap();
        assert_eq!(config.ai_mode, Mode::Local);
        assert_eq!(config.ollama.host, "http://10.0.0.2:11434");
        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.gemini.api_key.as_deref(), Some("from-generic"));
    }

    #[test]
    fn prefixed_api_key_wins() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("EVOS_GEMINI_API_KEY", "prefixed"),
                ("GEMINI_API_KEY", "generic"),
            ]))
            .unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("prefixed"));
    }

    #[test]
    fn bad_env_values_rejected() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(env(&[("EVOS_AI_MODE", "cloud")])).is_err());
        assert!(config.apply_env(env(&[("EVOS_MAX_AGENT_STEPS", "many")])).is_err());
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.gemini.api_key = Some("secret-value".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ai_mode = \"remote\""));
        assert!(toml_str.contains("llama3.2:3b"));
    }

    #[test]
    fn converts_into_core_error() {
        let err: evos_core::Error = ConfigError::ValidationError("bad".into()).into();
        assert!(matches!(err, evos_core::Error::Config { .. }));
        assert!(err.to_string().contains("bad"));
    }
}
