use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;

use crate::search::ControllerOptions;

pub const CONFIG_PATH_ENV: &str = "DUNGYZON_CONFIG";
pub const MODE_ENV: &str = "DUNGYZON_MODE";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Runtime mode, selects which API base URL is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    #[default]
    Production,
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "test" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            _ => Err(format!("Unknown run mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub mode: RunMode,

    #[serde(default = "default_development_url")]
    pub development_url: String,

    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Takes precedence over the mode-selected URL when set
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

fn default_development_url() -> String {
    "http://192.168.0.14:5000".to_string()
}

fn default_production_url() -> String {
    "https://dungyzonapi.onrender.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_items_per_page() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_storage_path() -> String {
    "data/storage.json".to_string()
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            development_url: default_development_url(),
            production_url: default_production_url(),
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            items_per_page: default_items_per_page(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            storage_path: default_storage_path(),
        }
    }
}

impl FrontendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: FrontendConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Applies a mode override such as the value of `DUNGYZON_MODE`.
    /// Unknown values are ignored with a warning.
    pub fn with_mode_override(mut self, mode: Option<&str>) -> Self {
        if let Some(raw) = mode {
            match raw.parse::<RunMode>() {
                Ok(mode) => self.mode = mode,
                Err(e) => tracing::warn!("Ignoring {}: {}", MODE_ENV, e),
            }
        }
        self
    }

    pub fn base_url(&self) -> &str {
        let url = match (&self.base_url, self.mode) {
            (Some(url), _) => url.as_str(),
            (None, RunMode::Development) => self.development_url.as_str(),
            (None, RunMode::Production) => self.production_url.as_str(),
        };
        url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            items_per_page: self.items_per_page.max(1),
            enabled: true,
        }
    }
}

pub static CONFIG: OnceLock<FrontendConfig> = OnceLock::new();

/// Loads the configuration into [`CONFIG`].
///
/// The path comes from `DUNGYZON_CONFIG` (default `config.toml`); a missing
/// file means defaults, a malformed one is an error.
pub fn read_config() -> anyhow::Result<&'static FrontendConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        FrontendConfig::from_file(&path)?
    } else {
        FrontendConfig::default()
    };
    let config = config.with_mode_override(std::env::var(MODE_ENV).ok().as_deref());

    Ok(CONFIG.get_or_init(|| config))
}
