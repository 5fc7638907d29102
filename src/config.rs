use serde::Deserialize;
use std::{fs, path::Path};

use crate::errors::ConfigError;

pub const DEFAULT_FROM: &str = "OvaHead <social@ovahead.com>";
pub const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// HTTP port to listen on.
    pub port: u16,

    /// Log level for tracing (e.g. "info", "debug").
    pub log_level: String,

    pub server_version: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Which key-value backend holds the signup records.
    #[serde(default)]
    pub backend: Backend,

    /// Path to the snapshot JSON file (memory backend only).
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Interval (seconds) between automatic snapshot saves.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,

    /// Connection URL for the redis backend, e.g. "redis://127.0.0.1/".
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            snapshot_path: default_snapshot_path(),
            snapshot_interval: default_snapshot_interval(),
            redis_url: None,
        }
    }
}

/// Welcome email provider settings.
///
/// Without an `api_key` the mailer is disabled and signups proceed silently.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,
}

impl EmailConfig {
    pub fn from_address(&self) -> &str {
        self.from.as_deref().unwrap_or(DEFAULT_FROM)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_EMAIL_ENDPOINT)
    }

    /// `RESEND_API_KEY` / `RESEND_FROM` take precedence over the file.
    fn apply_env(&mut self) {
        if let Some(key) = non_empty_env("RESEND_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(from) = non_empty_env("RESEND_FROM") {
            self.from = Some(from);
        }
        if self.api_key.as_deref().is_some_and(str::is_empty) {
            self.api_key = None;
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let file = fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        let mut cfg = Self::from_json(&file)?;
        cfg.email.apply_env();
        Ok(cfg)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str::<AppConfig>(json)?)
    }
}

fn default_snapshot_path() -> String {
    "signups.json".to_string()
}

fn default_snapshot_interval() -> u64 {
    30
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
