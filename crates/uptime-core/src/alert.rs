use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::ProbeOutcome;
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Alert,
    Critical,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert => write!(f, "ALERT"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Text handed to the notifier for one failed probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub target_url: String,
    pub severity: Severity,
    pub text: String,
}

/// Builds the alert for a failed outcome. `Up` produces no alert.
pub fn format_alert(
    target: &Target,
    outcome: &ProbeOutcome,
    timeout: Duration,
) -> Option<AlertMessage> {
    let url = &target.url;
    let (severity, text) = match outcome {
        ProbeOutcome::Up { .. } => return None,
        ProbeOutcome::WrongStatus { code } => (
            Severity::Alert,
            format!("{}: {} is DOWN! Status Code: {}", Severity::Alert, url, code),
        ),
        ProbeOutcome::ConnectionFailure => (
            Severity::Critical,
            format!(
                "{}: {} is UNREACHABLE (Connection Error)",
                Severity::Critical,
                url
            ),
        ),
        ProbeOutcome::Timeout => (
            Severity::Warning,
            format!(
                "{}: {} is TIMING OUT (>{}s)",
                Severity::Warning,
                url,
                format_seconds(timeout)
            ),
        ),
        ProbeOutcome::OtherError { detail } => (
            Severity::Error,
            format!("{}: {} failed with: {}", Severity::Error, url, detail),
        ),
    };

    Some(AlertMessage {
        target_url: url.clone(),
        severity,
        text,
    })
}

/// `5s` stays `5`, `2.5s` stays `2.5`.
fn format_seconds(d: Duration) -> String {
    format!("{}", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> Target {
        Target::new("t", url)
    }

    #[test]
    fn up_has_no_alert() {
        let outcome = ProbeOutcome::Up {
            latency: Duration::from_millis(10),
        };
        assert!(format_alert(&target("https://ok.example"), &outcome, Duration::from_secs(5)).is_none());
    }

    #[test]
    fn wrong_status_template() {
        let alert = format_alert(
            &target("https://down.example"),
            &ProbeOutcome::WrongStatus { code: 503 },
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(alert.severity, Severity::Alert);
        assert_eq!(alert.text, "ALERT: https://down.example is DOWN! Status Code: 503");
    }

    #[test]
    fn connection_failure_template() {
        let alert = format_alert(
            &target("https://gone.example"),
            &ProbeOutcome::ConnectionFailure,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(
            alert.text,
            "CRITICAL: https://gone.example is UNREACHABLE (Connection Error)"
        );
    }

    #[test]
    fn timeout_template_uses_configured_timeout() {
        let alert = format_alert(
            &target("https://slow.example"),
            &ProbeOutcome::Timeout,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.text, "WARNING: https://slow.example is TIMING OUT (>5s)");

        let alert = format_alert(
            &target("https://slow.example"),
            &ProbeOutcome::Timeout,
            Duration::from_millis(2500),
        )
        .unwrap();
        assert!(alert.text.ends_with("TIMING OUT (>2.5s)"), "{}", alert.text);
    }

    #[test]
    fn other_error_template_carries_detail() {
        let alert = format_alert(
            &target("https://tls.example"),
            &ProbeOutcome::OtherError {
                detail: "invalid peer certificate".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(
            alert.text,
            "ERROR: https://tls.example failed with: invalid peer certificate"
        );
        assert_eq!(alert.target_url, "https://tls.example");
    }
}
