//! Engine configuration.
//!
//! Loaded from an optional TOML file and overridden by environment
//! variables. Every section has defaults, so an empty file is valid.

use crate::error::TesseraResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default base URL for relative data source endpoints.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Default Luau heap limit per transform: 4 MB.
pub const DEFAULT_TRANSFORM_MEMORY_LIMIT: usize = 4 * 1024 * 1024;

/// Default number of interrupt checks a transform may consume.
pub const DEFAULT_INSTRUCTION_BUDGET: u64 = 100_000;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: FetchSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub transform: TransformSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Shared HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Where widget definitions come from. `url` wins over `widgets_file`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub widgets_file: Option<PathBuf>,
}

/// Sandbox limits for user-authored transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: usize,
    #[serde(default = "default_instruction_budget")]
    pub instruction_budget: u64,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_limit_bytes: DEFAULT_TRANSFORM_MEMORY_LIMIT,
            instruction_budget: DEFAULT_INSTRUCTION_BUDGET,
        }
    }
}

/// Web surface bind address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_memory_limit() -> usize {
    DEFAULT_TRANSFORM_MEMORY_LIMIT
}

fn default_instruction_budget() -> u64 {
    DEFAULT_INSTRUCTION_BUDGET
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3040
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> TesseraResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from an optional file, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> TesseraResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading engine config");
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `TESSERA_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TESSERA_API_BASE_URL") {
            self.engine.api_base_url = url;
        }
        if let Some(url) = lookup("TESSERA_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(file) = lookup("TESSERA_WIDGETS_FILE") {
            self.store.widgets_file = Some(PathBuf::from(file));
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.engine.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.transform.enabled);
        assert_eq!(config.server.port, 3040);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml(
            "[engine]\napi_base_url = \"https://erp.example.com/api\"\n\n[transform]\nenabled = false\n",
        )
        .unwrap();
        assert_eq!(config.engine.api_base_url, "https://erp.example.com/api");
        assert_eq!(config.engine.request_timeout_secs, 15);
        assert!(!config.transform.enabled);
        assert_eq!(config.transform.instruction_budget, DEFAULT_INSTRUCTION_BUDGET);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config.apply_env(|key| match key {
            "TESSERA_STORE_URL" => Some("http://store.local".to_string()),
            _ => None,
        });
        assert_eq!(config.store.url.as_deref(), Some("http://store.local"));
        assert_eq!(config.engine.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(EngineConfig::from_toml("[engine\n").is_err());
    }
}
