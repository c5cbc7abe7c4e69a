use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cache::CollectionKind;
use crate::error::{FitproError, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_seconds: None,
        }
    }
}

/// Per-collection refresh cadence. Plans and bookmarks change during active
/// use; history and notes are rarely edited by a second actor.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct PollingConfig {
    #[serde(default = "default_fast_poll")]
    pub plans_seconds: u64,
    #[serde(default = "default_fast_poll")]
    pub bookmarks_seconds: u64,
    #[serde(default = "default_slow_poll")]
    pub history_seconds: u64,
    #[serde(default = "default_slow_poll")]
    pub notes_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            plans_seconds: default_fast_poll(),
            bookmarks_seconds: default_fast_poll(),
            history_seconds: default_slow_poll(),
            notes_seconds: default_slow_poll(),
        }
    }
}

impl PollingConfig {
    pub fn seconds(&self, kind: CollectionKind) -> u64 {
        match kind {
            CollectionKind::Plans => self.plans_seconds,
            CollectionKind::Bookmarks => self.bookmarks_seconds,
            CollectionKind::History => self.history_seconds,
            CollectionKind::Notes => self.notes_seconds,
        }
    }

    pub fn interval(&self, kind: CollectionKind) -> Duration {
        Duration::from_secs(self.seconds(kind))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_fast_poll() -> u64 {
    15
}

fn default_slow_poll() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    pub client_id: Option<String>,
    pub default_duration_minutes: Option<u32>,
}

impl Config {
    pub fn convention_defaults() -> Self {
        Self {
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            client_id: None,
            default_duration_minutes: Some(DEFAULT_DURATION_MINUTES),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| FitproError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| FitproError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(url) = non_blank_env("FITPRO_API_URL") {
            self.api.base_url = url;
        }
        if let Some(token) = non_blank_env("FITPRO_AUTH_TOKEN") {
            self.api.auth_token = Some(token);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(FitproError::Config("api.base_url must not be empty".to_string()));
        }
        for kind in CollectionKind::ALL {
            if self.polling.seconds(kind) == 0 {
                return Err(FitproError::Config(format!(
                    "polling interval for {} must be positive",
                    kind.label()
                )));
            }
        }
        if self.default_duration_minutes == Some(0) {
            return Err(FitproError::Config(
                "default_duration_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_duration(&self) -> u32 {
        self.default_duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES)
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
