//! Client configuration.
//!
//! Read from `<config_dir>/ticketsync/config.json` when present, then
//! overridden by `TICKETSYNC_*` environment variables. A missing file is not
//! an error: with no API URL the client simply stays offline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = "ticketsync";
const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "tickets.db";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "TICKETSYNC_API_URL";
pub const ENV_API_TOKEN: &str = "TICKETSYNC_API_TOKEN";
pub const ENV_DB_PATH: &str = "TICKETSYNC_DB_PATH";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the ticket API, e.g. `https://tickets.example.com`
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Bearer token sent with every API request
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            db_path: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("db_path", &self.db_path)
            .finish()
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(DB_FILE_NAME))
}

impl ClientConfig {
    /// Load the default config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config = match default_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!("Failed to parse {}: {error}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Loaded client config");
        config.normalized()
    }

    /// Apply `TICKETSYNC_*` overrides read through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_API_TOKEN)) {
            self.api_token = Some(token);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.db_path = Some(PathBuf::from(path));
        }
        self.normalized()
    }

    /// Trim values, drop empties and validate the API URL and timeout.
    pub fn normalized(mut self) -> Result<Self> {
        self.api_token = normalize_text_option(self.api_token);
        self.api_base_url = match normalize_text_option(self.api_base_url) {
            Some(url) => Some(normalize_http_url(&url, "api_base_url")?),
            None => None,
        };
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether a remote API is configured at all
    pub const fn has_remote(&self) -> bool {
        self.api_base_url.is_some()
    }

    /// Database path: explicit argument, then config/env, then the platform
    /// data directory.
    pub fn resolve_db_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        explicit
            .or_else(|| self.db_path.clone())
            .or_else(default_db_path)
            .ok_or_else(|| Error::Config("Failed to resolve a data directory".to_string()))
    }
}

fn normalize_http_url(value: &str, field: &str) -> Result<String> {
    if is_http_url(value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "{field} must include http:// or https://"
        )))
    }
}
