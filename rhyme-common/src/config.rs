//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a single TOML file. Every section has
//! compiled defaults, so a missing file (or a file that only sets a few keys)
//! still yields a complete [`TomlConfig`].
//!
//! # Config File Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `RHYME_CONFIG` environment variable
//! 3. `<config_dir>/rhyme/config.toml`
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RHYME_CONFIG";

/// Environment variable holding the inference service API key
pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub inference: InferenceConfig,
    pub chunking: ChunkingConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// External inference service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// API key; `ANTHROPIC_API_KEY` takes priority when set
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Total request timeout per window call
    pub timeout_secs: u64,
    /// Outbound pacing across all requests (0 disables pacing)
    pub requests_per_minute: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-opus-20240229".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            timeout_secs: 60,
            requests_per_minute: 50,
        }
    }
}

/// Window planning settings, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_window_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_window_chars: 2000,
            overlap_chars: 200,
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached results (0 disables caching)
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Inbound request quotas, per client address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Analyze requests allowed per minute (0 disables limiting)
    pub analyze_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            analyze_per_minute: 10,
        }
    }
}

/// Metrics export settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Bearer tokens granted access to `/metrics`
    pub admin_tokens: Vec<String>,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Suspicious but non-fatal settings, for logging at startup
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.chunking.max_window_chars == 0 {
            warnings.push("chunking.max_window_chars is 0; windows of 1 character will be used".to_string());
        } else if self.chunking.overlap_chars >= self.chunking.max_window_chars {
            warnings.push(format!(
                "chunking.overlap_chars ({}) >= max_window_chars ({}); windows will advance by half a window",
                self.chunking.overlap_chars, self.chunking.max_window_chars
            ));
        }

        if self.cache.capacity == 0 {
            warnings.push("cache.capacity is 0; results will not be cached".to_string());
        }

        if self.metrics.admin_tokens.is_empty() {
            warnings.push("metrics.admin_tokens is empty; /metrics will reject every request".to_string());
        }

        warnings
    }
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/rhyme/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rhyme").join("config.toml"))
}

/// Load configuration following the priority order above
///
/// A config file that was explicitly requested (CLI or ENV) but cannot be read
/// is an error. A missing default file is not: defaults are used.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            let config = TomlConfig::load(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => {
            warn!("No config file found; using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the inference API key
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(config: &InferenceConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok();
    let toml_key = config.api_key.as_ref();

    if let (Some(env), Some(toml)) = (&env_key, toml_key) {
        if is_valid_key(env) && is_valid_key(toml) {
            warn!("API key found in environment and TOML config. Using environment.");
        }
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    Err(Error::Config(format!(
        "Inference API key not configured. Set {} or inference.api_key in the config file",
        API_KEY_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
