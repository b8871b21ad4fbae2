//! Configuration for memagent
//!
//! Values come from three layers, later ones winning:
//! 1. built-in defaults
//! 2. an optional JSON file (`~/.memagent/config.json`, or `MEMAGENT_CONFIG`)
//! 3. environment variables:
//!    - `GOOGLE_API_KEY` - Required. Gemini API key.
//!    - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//!    - `PORT` - Optional. Server port. Defaults to `8000`.
//!    - `LOG_LEVEL` - Optional. Log filter. Defaults to `info`.
//!    - `GEMINI_MODEL` - Optional. Defaults to `gemini-1.5-pro`.
//!    - `GEMINI_API_BASE` - Optional. Gemini REST base URL.
//!    - `AGENT_TEMPERATURE` - Optional. Defaults to `0.7`.
//!    - `AGENT_MAX_ITERATIONS` - Optional. Generate steps per turn. Defaults to `10`.
//!    - `MEMAGENT_STORE_DIR` - Optional. Persist threads as JSON files here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub mod paths;

pub use paths::{config_path, data_dir, env_file_path};

/// Credential variable; its absence is fatal at startup
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Overrides the config file location
pub const CONFIG_PATH_VAR: &str = "MEMAGENT_CONFIG";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant tasked with performing arithmetic on a set of inputs. \
You can perform addition, multiplication, and division operations. \
Always be helpful and provide clear explanations of your calculations.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Gemini access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    60
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_max_iterations() -> u32 {
    10
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// HTTP service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Conversation store settings. No directory means in-memory only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load the config file (if any) and apply process environment overrides
    pub async fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_path());
        let mut config = Self::load_from(&path).await?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load from a specific JSON file; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Defaults plus overrides from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        info!("Config written to {:?}", path);
        Ok(())
    }

    /// Apply environment-style overrides. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_VAR) {
            self.model.api_key = key;
        }
        if let Some(base) = get("GEMINI_API_BASE") {
            self.model.api_base = Some(base);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.model.model = model;
        }
        if let Some(value) = get("AGENT_TEMPERATURE") {
            self.model.temperature = parse_var("AGENT_TEMPERATURE", &value)?;
        }
        if let Some(value) = get("AGENT_MAX_ITERATIONS") {
            self.agent.max_tool_iterations = parse_var("AGENT_MAX_ITERATIONS", &value)?;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(value) = get("PORT") {
            self.server.port = parse_var("PORT", &value)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.server.log_level = level;
        }
        if let Some(dir) = get("MEMAGENT_STORE_DIR") {
            self.store.dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    /// The credential, or the startup error that forbids serving traffic
    pub fn require_api_key(&self) -> Result<&str> {
        if self.has_api_key() {
            Ok(&self.model.api_key)
        } else {
            Err(ConfigError::MissingEnvVar(API_KEY_VAR.to_string()))
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.model.api_key.trim().is_empty()
    }

    /// Key with only its edges visible, for status output
    pub fn masked_api_key(&self) -> Option<String> {
        if !self.has_api_key() {
            return None;
        }
        let chars: Vec<char> = self.model.api_key.chars().collect();
        if chars.len() <= 12 {
            return Some("*".repeat(chars.len()));
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        Some(format!("{}...{}", head, tail))
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), value.to_string()))
}
