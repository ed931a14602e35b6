//! Pacer configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mode::MoodPolicy;
use crate::pipeline::CapacityPolicy;
use crate::timer::TimerPolicy;

/// Main Pacer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advice service (LLM) configuration
    pub advice: AdviceConfig,

    /// Session timer durations
    pub timers: TimerPolicy,

    /// Mood classification thresholds
    pub mood: MoodPolicy,

    /// Daily capacity check
    pub capacity: CapacityPolicy,

    /// Storage locations
    pub storage: StorageConfig,

    /// Log level used when none is given on the command line
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .pacer.yml
        let local_config = PathBuf::from(".pacer.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/pacer/pacer.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pacer").join("pacer.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Advice service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in milliseconds; a slower answer counts as a failure
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 2048,
            timeout_ms: 20_000,
        }
    }
}

impl AdviceConfig {
    /// API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the record store
    #[serde(rename = "store-dir")]
    pub store_dir: String,

    /// Pipeline draft snapshot file
    #[serde(rename = "draft-file")]
    pub draft_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // XDG data directory (~/.local/share/pacer on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("pacer"))
            .unwrap_or_else(|| PathBuf::from(".pacer"));

        Self {
            store_dir: data_dir.to_string_lossy().into_owned(),
            draft_file: data_dir.join("draft.json").to_string_lossy().into_owned(),
        }
    }
}

impl StorageConfig {
    pub fn store_path(&self) -> PathBuf {
        expand_home(&self.store_dir)
    }

    pub fn draft_path(&self) -> PathBuf {
        expand_home(&self.draft_file)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
