//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! backend base URL, which credential storage backend to open, the login
//! entry point announced on session loss, and which endpoints are
//! credential-issuing exchanges.
//!
//! Configuration is stored at `~/.config/lexgate/config.json`. The
//! `LEXGATE_API_URL` and `LEXGATE_STORAGE` environment variables override it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::StorageKind;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "lexgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:8000";

const DEFAULT_LOGIN_PATH: &str = "/login";

/// HTTP request timeout in seconds.
/// Retrieval answers can take several seconds to generate.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const ENV_API_URL: &str = "LEXGATE_API_URL";
pub const ENV_STORAGE: &str = "LEXGATE_STORAGE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageKind,
    /// Where the host should navigate when the session ends
    pub login_path: String,
    /// Endpoints whose 401 means "bad credentials", not "session ended"
    pub auth_endpoints: Vec<String>,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            storage: StorageKind::default(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            auth_endpoints: vec!["/auth/login".to_string(), "/auth/register".to_string()],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from disk (or defaults), then apply environment overrides.
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

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(kind) = lookup(ENV_STORAGE).filter(|v| !v.trim().is_empty()) {
            self.storage = kind
                .parse::<StorageKind>()
                .with_context(|| format!("Invalid {ENV_STORAGE} value"))?;
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

    /// True for `https` URLs and for `localhost` over any scheme.
    pub fn is_secure_transport(&self) -> bool {
        match Url::parse(&self.api_base_url) {
            Ok(url) => url.scheme() == "https" || url.host_str() == Some("localhost"),
            Err(_) => false,
        }
    }

    /// Warn when bearer tokens would travel over plaintext to a remote host.
    pub fn check_security_context(&self) {
        if !self.is_secure_transport() {
            warn!(
                api_base_url = %self.api_base_url,
                "Not using HTTPS; bearer tokens may be exposed in transit"
            );
        }
    }
}
