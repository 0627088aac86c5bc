use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str = concat!("uptime-monitor/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every cycle a [`crate::Monitor`] runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Hard upper bound for a single probe, body included (default: 5s).
    pub request_timeout: Duration,
    /// Probes in flight at once. 1 keeps the loop strictly sequential.
    pub max_concurrent_probes: usize,
    /// Follow redirects before judging the final status (default: true).
    pub follow_redirects: bool,
    pub user_agent: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            max_concurrent_probes: 1,
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max.max(1);
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
