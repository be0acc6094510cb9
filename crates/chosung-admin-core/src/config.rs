//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the admin API URL, deployment base path, request timeout
//! and last used login email.
//!
//! Configuration is stored at `~/.config/chosung-admin/config.json`.
//! Environment variables (`CHOSUNG_ADMIN_API_URL`, `CHOSUNG_ADMIN_PUBLIC_URL`,
//! `CHOSUNG_ADMIN_TIMEOUT_MS`) override the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::MissingCredentialPolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "chosung-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Cookie file name in cache directory
const COOKIE_FILE: &str = "cookies.json";

/// Default admin API endpoint when nothing is configured.
const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Request timeout in milliseconds.
/// The dashboard gives up after 5s so a stuck call never freezes a page.
const DEFAULT_TIMEOUT_MS: u64 = 5000;

const ENV_API_URL: &str = "CHOSUNG_ADMIN_API_URL";
const ENV_PUBLIC_URL: &str = "CHOSUNG_ADMIN_PUBLIC_URL";
const ENV_TIMEOUT_MS: &str = "CHOSUNG_ADMIN_TIMEOUT_MS";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Deployment base path prefixed to the login redirect.
    #[serde(default)]
    pub public_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub missing_credential_policy: MissingCredentialPolicy,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            public_url: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            missing_credential_policy: MissingCredentialPolicy::default(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(base) = lookup(ENV_PUBLIC_URL) {
            self.public_url = base;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS))?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Location of the persistent cookie jar.
    pub fn cookie_path(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(COOKIE_FILE))
    }
}
