//! Configuration loading, validation, and management for OrbitChat.
//!
//! Loads configuration from `~/.orbitchat/config.toml` (or the file named by
//! `ORBITCHAT_CONFIG`), then a local `.env` file, then environment variable
//! overrides. Everything is read once at process start and validated.

use orbitchat_core::data::{DataCategory, GeoPoint};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.orbitchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion-API credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible completion API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature; left to the upstream default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max tokens per LLM response; left to the upstream default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Timeout for a single completion request, including streaming
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// External space-data configuration
    #[serde(default)]
    pub space_data: SpaceDataConfig,

    /// Keyword classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Terminal client configuration
    #[serde(default)]
    pub terminal: TerminalConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-5".into()
}
fn default_request_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("gateway", &self.gateway)
            .field("space_data", &self.space_data)
            .field("classifier", &self.classifier)
            .field("terminal", &self.terminal)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` listen address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SpaceDataConfig {
    /// Data-provider credential (NASA open APIs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_nasa_base_url")]
    pub base_url: String,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Run the fetchers of one request concurrently
    #[serde(default = "default_true")]
    pub concurrent: bool,

    /// Location used when a chat message triggers earth imagery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_location: Option<GeoPoint>,
}

fn default_nasa_base_url() -> String {
    "https://api.nasa.gov".into()
}
fn default_fetch_timeout() -> u64 {
    15
}

impl Default for SpaceDataConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_nasa_base_url(),
            timeout_secs: default_fetch_timeout(),
            concurrent: true,
            default_location: None,
        }
    }
}

impl std::fmt::Debug for SpaceDataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpaceDataConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("concurrent", &self.concurrent)
            .field("default_location", &self.default_location)
            .finish()
    }
}

/// One vocabulary term and the data category it implicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub term: String,
    pub category: DataCategory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Replaces the built-in vocabulary when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<KeywordEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Base URL of a running OrbitChat server
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default = "default_terminal_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".into()
}
fn default_terminal_timeout() -> u64 {
    60
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            timeout_secs: default_terminal_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path, `.env`, and the environment.
    ///
    /// Environment variables (highest priority):
    /// - `ORBITCHAT_API_KEY` or `OPENAI_API_KEY`: completion credential
    /// - `OPENAI_BASE_URL`, `OPENAI_MODEL`
    /// - `NASA_API_KEY`, `NASA_BASE_URL`: data-provider credential and host
    /// - `HOST`, `PORT`: listen address
    /// - `ORBITCHAT_BACKEND_URL`: server used by the terminal client
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {e}");
        }

        let config_path = Self::config_path(|key| std::env::var(key).ok());

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

    /// Apply overrides from an environment lookup. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("ORBITCHAT_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.api_url = url;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.default_model = model;
        }
        if let Some(key) = var("NASA_API_KEY") {
            self.space_data.api_key = Some(key);
        }
        if let Some(url) = var("NASA_BASE_URL") {
            self.space_data.base_url = url;
        }
        if let Some(host) = var("HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = var("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "PORT".into(),
                value: port.clone(),
            })?;
        }
        if let Some(url) = var("ORBITCHAT_BACKEND_URL") {
            self.terminal.backend_url = url;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".orbitchat")
    }

    /// The config file `load` reads: `ORBITCHAT_CONFIG` if set and non-empty,
    /// otherwise `config.toml` in [`config_dir`](Self::config_dir).
    pub fn config_path<F>(lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("ORBITCHAT_CONFIG")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        for (name, url) in [
            ("api_url", &self.api_url),
            ("space_data.base_url", &self.space_data.base_url),
            ("terminal.backend_url", &self.terminal.backend_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must start with http:// or https:// (got '{url}')"
                )));
            }
        }

        if self.request_timeout_secs == 0
            || self.space_data.timeout_secs == 0
            || self.terminal.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        if let Some(location) = self.space_data.default_location {
            if !location.is_valid() {
                return Err(ConfigError::ValidationError(format!(
                    "space_data.default_location out of range: ({}, {})",
                    location.lat, location.lon
                )));
            }
            if location.is_origin() {
                return Err(ConfigError::ValidationError(
                    "space_data.default_location must not be (0, 0)".into(),
                ));
            }
        }

        if let Some(vocabulary) = &self.classifier.vocabulary {
            if vocabulary.iter().any(|k| k.term.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "classifier.vocabulary terms must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Check if a completion-API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Check if a data-provider key is available.
    pub fn has_data_key(&self) -> bool {
        self.space_data.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            temperature: None,
            max_tokens: None,
            request_timeout_secs: default_request_timeout(),
            gateway: GatewayConfig::default(),
            space_data: SpaceDataConfig::default(),
            classifier: ClassifierConfig::default(),
            terminal: TerminalConfig::default(),
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

    #[error("Invalid value for environment variable {key}: '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
