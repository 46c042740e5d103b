use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use storefront_cart::SyncConfig;
use storefront_common::{load_json_config, CommonResult, FileSystem, RealFileSystem};

pub const DEFAULT_CONFIG_NAME: &str = "storefront.config.json";

/// Environment variable overriding `apiUrl`
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

/// Storefront client configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the storefront API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Transport-level request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Synchronizer options
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_api_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl ClientConfig {
    /// Load config from a directory, then apply environment overrides
    pub fn load(dir: &Path) -> CommonResult<Self> {
        let config = Self::load_with(&RealFileSystem, dir)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Load config through `fs`; defaults when the file is missing
    pub fn load_with<F: FileSystem + ?Sized>(fs: &F, dir: &Path) -> CommonResult<Self> {
        load_json_config(fs, dir, DEFAULT_CONFIG_NAME)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(api_url) = lookup(API_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.api_url = api_url;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_ms: default_timeout_ms(),
            sync: SyncConfig::default(),
        }
    }
}
