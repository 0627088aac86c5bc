//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! targets = [
//!   "https://example.com",
//!   { id = "status-page", url = "https://status.example.com/health" },
//! ]
//!
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [monitor]
//! timeout_secs = 5
//! interval_secs = 60
//! max_concurrent = 1
//! follow_redirects = true
//!
//! [webhook]
//! url = "https://discord.com/api/webhooks/..."
//! success_status = 204
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use uptime_core::target::{default_target_id, validate_targets};
use uptime_core::{ConfigError, MonitorConfig, Target, WebhookConfig};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("Invalid log_format '{0}': must be 'pretty' or 'json'")]
    LogFormat(String),
    #[error("Invalid {field}: {reason}")]
    Value { field: &'static str, reason: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub webhook: Option<WebhookConfig>,

    #[serde(default)]
    pub targets: Vec<TargetDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            interval_secs: default_interval_secs(),
            max_concurrent: default_max_concurrent(),
            follow_redirects: default_follow_redirects(),
            user_agent: None,
        }
    }
}

fn default_timeout_secs() -> f64 {
    5.0
}

fn default_interval_secs() -> u64 {
    60
}

fn default_max_concurrent() -> usize {
    1
}

fn default_follow_redirects() -> bool {
    true
}

/// A target entry: either a bare URL string or `{ id, url }` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TargetDef {
    Url(String),
    Object { id: Option<String>, url: String },
}

impl TargetDef {
    fn into_target(self, index: usize) -> Target {
        match self {
            TargetDef::Url(url) => Target::at_position(index, url),
            TargetDef::Object { id, url } => Target {
                id: id.unwrap_or_else(|| default_target_id(index)),
                url,
            },
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub targets: Vec<String>,
    pub webhook_url: Option<String>,
    pub timeout_secs: Option<f64>,
    pub max_concurrent: Option<usize>,
    pub interval_secs: Option<u64>,
    pub listen: Option<SocketAddr>,
}

/// Fully validated settings, ready to build a monitor from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub targets: Vec<Target>,
    pub monitor: MonitorConfig,
    pub webhook: WebhookConfig,
    pub interval: Duration,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| LoadError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads the file when given, otherwise starts from defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, LoadError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if !overrides.targets.is_empty() {
            self.targets = overrides.targets.into_iter().map(TargetDef::Url).collect();
        }
        if let Some(url) = overrides.webhook_url {
            match self.webhook.as_mut() {
                Some(wh) => wh.url = url,
                None => self.webhook = Some(WebhookConfig::new(url)),
            }
        }
        if let Some(t) = overrides.timeout_secs {
            self.monitor.timeout_secs = t;
        }
        if let Some(c) = overrides.max_concurrent {
            self.monitor.max_concurrent = c;
        }
        if let Some(i) = overrides.interval_secs {
            self.monitor.interval_secs = i;
        }
        if let Some(l) = overrides.listen {
            self.server.listen = l;
        }
    }

    /// Validates everything a cycle depends on. Any error here is fatal.
    pub fn into_settings(self) -> Result<Settings, LoadError> {
        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => return Err(LoadError::LogFormat(other.to_string())),
        }

        let targets: Vec<Target> = self
            .targets
            .into_iter()
            .enumerate()
            .map(|(i, t)| t.into_target(i))
            .collect();
        validate_targets(&targets)?;

        let webhook = self.webhook.ok_or(ConfigError::MissingWebhook)?;
        webhook.validate()?;

        let timeout = Duration::try_from_secs_f64(self.monitor.timeout_secs).map_err(|e| {
            LoadError::Value {
                field: "timeout_secs",
                reason: e.to_string(),
            }
        })?;
        if self.monitor.interval_secs == 0 {
            return Err(LoadError::Value {
                field: "interval_secs",
                reason: "must be greater than zero".into(),
            });
        }

        let mut monitor = MonitorConfig::default()
            .with_request_timeout(timeout)
            .with_max_concurrent_probes(self.monitor.max_concurrent)
            .with_follow_redirects(self.monitor.follow_redirects);
        if let Some(ua) = self.monitor.user_agent {
            monitor = monitor.with_user_agent(ua);
        }
        monitor.validate()?;

        Ok(Settings {
            targets,
            monitor,
            webhook,
            interval: Duration::from_secs(self.monitor.interval_secs),
            server: self.server,
        })
    }
}
