//! Configuration loading, validation, and management for hintforge.
//!
//! Loads configuration from `~/.hintforge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.hintforge/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Code execution service settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Problem scraper settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Token and password settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Chat pipeline knobs
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            runner: RunnerConfig::default(),
            scraper: ScraperConfig::default(),
            auth: AuthConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum accepted request body size
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8460
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".into()]
}
fn default_max_body_bytes() -> usize {
    256 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file; created on first use
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    AppConfig::config_dir().join("hintforge.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; usually supplied via `GROQ_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model for generation, extraction, judging, and rewriting
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model for the history summarizer
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,

    #[serde(default = "default_judge_temperature")]
    pub judge_temperature: f32,

    #[serde(default = "default_rewrite_temperature")]
    pub rewrite_temperature: f32,

    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,

    /// Fixed seed for the summarizer, so re-summarizing the same history is stable
    #[serde(default = "default_summary_seed")]
    pub summary_seed: u64,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_chat_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".into()
}
fn default_summary_model() -> String {
    "qwen-qwq-32b".into()
}
fn default_chat_temperature() -> f32 {
    0.3
}
fn default_judge_temperature() -> f32 {
    0.3
}
fn default_rewrite_temperature() -> f32 {
    0.8
}
fn default_summary_temperature() -> f32 {
    0.4
}
fn default_summary_seed() -> u64 {
    432
}
fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            chat_model: default_chat_model(),
            summary_model: default_summary_model(),
            chat_temperature: default_chat_temperature(),
            judge_temperature: default_judge_temperature(),
            rewrite_temperature: default_rewrite_temperature(),
            summary_temperature: default_summary_temperature(),
            summary_seed: default_summary_seed(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("chat_model", &self.chat_model)
            .field("summary_model", &self.summary_model)
            .field("chat_temperature", &self.chat_temperature)
            .field("judge_temperature", &self.judge_temperature)
            .field("rewrite_temperature", &self.rewrite_temperature)
            .field("summary_temperature", &self.summary_temperature)
            .field("summary_seed", &self.summary_seed)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Full URL of the execution endpoint
    #[serde(default = "default_execute_url")]
    pub execute_url: String,

    #[serde(default = "default_runner_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_execute_url() -> String {
    "http://127.0.0.1:3000/execute".into()
}
fn default_runner_timeout_secs() -> u64 {
    120
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            execute_url: default_execute_url(),
            timeout_secs: default_runner_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// LeetCode GraphQL endpoint
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    #[serde(default = "default_scraper_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_graphql_url() -> String {
    "https://leetcode.com/graphql/".into()
}
fn default_scraper_timeout_secs() -> u64 {
    30
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            timeout_secs: default_scraper_timeout_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens; usually supplied via `HINTFORGE_TOKEN_SECRET`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,

    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,

    #[serde(default = "default_refresh_ttl_minutes")]
    pub refresh_ttl_minutes: i64,

    /// bcrypt work factor for password hashes
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_access_ttl_minutes() -> i64 {
    30
}
fn default_refresh_ttl_minutes() -> i64 {
    7 * 24 * 60
}
fn default_bcrypt_cost() -> u32 {
    12
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_minutes: default_refresh_ttl_minutes(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &redact(&self.token_secret))
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_minutes", &self.refresh_ttl_minutes)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Summarize once the history holds more than this many turns
    #[serde(default = "default_history_threshold")]
    pub history_threshold: usize,

    /// Maximum generate → judge rounds before the pipeline gives up
    #[serde(default = "default_max_judge_rounds")]
    pub max_judge_rounds: u32,
}

fn default_history_threshold() -> usize {
    10
}
fn default_max_judge_rounds() -> u32 {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_threshold: default_history_threshold(),
            max_judge_rounds: default_max_judge_rounds(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.hintforge/config.toml).
    ///
    /// Environment variables override file values:
    /// - `GROQ_API_KEY` / `HINTFORGE_API_KEY` → llm.api_key
    /// - `CODE_RUNNER_API_URL` / `HINTFORGE_RUNNER_URL` → runner.execute_url
    /// - `HINTFORGE_TOKEN_SECRET` → auth.token_secret
    /// - `HINTFORGE_DB_PATH` → database.path
    /// - `HINTFORGE_PORT` → server.port
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
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

    /// Apply environment variable overrides (highest priority).
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = std::env::var("HINTFORGE_API_KEY")
            .ok()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
        {
            self.llm.api_key = Some(key);
        }

        if let Some(url) = std::env::var("HINTFORGE_RUNNER_URL")
            .ok()
            .or_else(|| std::env::var("CODE_RUNNER_API_URL").ok())
        {
            self.runner.execute_url = url;
        }

        if let Ok(secret) = std::env::var("HINTFORGE_TOKEN_SECRET") {
            self.auth.token_secret = Some(secret);
        }

        if let Ok(path) = std::env::var("HINTFORGE_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(port) = std::env::var("HINTFORGE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid HINTFORGE_PORT value: {port}"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".hintforge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("llm.chat_temperature", self.llm.chat_temperature),
            ("llm.judge_temperature", self.llm.judge_temperature),
            ("llm.rewrite_temperature", self.llm.rewrite_temperature),
            ("llm.summary_temperature", self.llm.summary_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.pipeline.history_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.history_threshold must be at least 1".into(),
            ));
        }

        if self.pipeline.max_judge_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_judge_rounds must be at least 1".into(),
            ));
        }

        if self.auth.access_ttl_minutes <= 0 || self.auth.refresh_ttl_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "auth token TTLs must be positive".into(),
            ));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::ValidationError(
                "auth.bcrypt_cost must be between 4 and 31".into(),
            ));
        }

        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8460);
        assert_eq!(config.pipeline.history_threshold, 10);
        assert_eq!(config.llm.summary_seed, 432);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.llm.chat_model, config.llm.chat_model);
        assert_eq!(parsed.pipeline.max_judge_rounds, config.pipeline.max_judge_rounds);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.rewrite_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_judge_rounds_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.max_judge_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.llm.api_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9999\n\n[pipeline]\nhistory_threshold = 4\n"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.pipeline.history_threshold, 4);
        // untouched sections keep their defaults
        assert_eq!(config.llm.summary_model, "qwen-qwq-32b");
        assert_eq!(config.pipeline.max_judge_rounds, 2);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server = \"not a table\"").unwrap();

        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("gsk_super_secret".into());
        config.auth.token_secret = Some("hmac_secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gsk_super_secret"));
        assert!(!rendered.contains("hmac_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("api.groq.com"));
        assert!(toml_str.contains("8460"));
    }
}
