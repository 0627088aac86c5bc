use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{validate_http_url, ConfigError};

/// A URL checked once per cycle. The target set is fixed for a monitor's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: String,
}

impl Target {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Builds a target whose ID is derived from its 0-based position.
    pub fn at_position(index: usize, url: impl Into<String>) -> Self {
        Self::new(default_target_id(index), url)
    }
}

pub fn default_target_id(index: usize) -> String {
    format!("target_{}", index + 1)
}

/// Turns bare URLs into targets, preserving order.
pub fn targets_from_urls<I, S>(urls: I) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    urls.into_iter()
        .enumerate()
        .map(|(i, url)| Target::at_position(i, url))
        .collect()
}

/// Rejects an empty set, malformed URLs, and duplicate IDs or URLs.
pub fn validate_targets(targets: &[Target]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }

    let mut ids = HashSet::new();
    let mut urls = HashSet::new();
    for target in targets {
        if target.id.is_empty() {
            return Err(ConfigError::EmptyTargetId);
        }
        validate_http_url("target", &target.url)?;
        if !ids.insert(target.id.as_str()) {
            return Err(ConfigError::DuplicateTarget {
                field: "ID",
                value: target.id.clone(),
            });
        }
        if !urls.insert(target.url.as_str()) {
            return Err(ConfigError::DuplicateTarget {
                field: "URL",
                value: target.url.clone(),
            });
        }
    }
    Ok(())
}
