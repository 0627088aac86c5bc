use thiserror::Error;

/// Configuration problems detected before any check cycle runs.
///
/// These are the only fatal errors in the core: per-target probe failures and
/// alert delivery failures are reported as values, never as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No targets configured")]
    NoTargets,
    #[error("Webhook URL is not configured")]
    MissingWebhook,
    #[error("Invalid {field} URL '{url}': {reason}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        reason: String,
    },
    #[error("Duplicate target {field}: {value}")]
    DuplicateTarget { field: &'static str, value: String },
    #[error("Target ID must not be empty")]
    EmptyTargetId,
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Checks that `raw` parses as an absolute http(s) URL.
pub fn validate_http_url(field: &'static str, raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}', expected http or https", other),
        }),
    }
}
