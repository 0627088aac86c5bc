mod http;

pub use http::HttpProber;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Classified result of one probe. Failure variants are ordinary values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Up {
        #[serde(rename = "latency_secs", with = "duration_secs")]
        latency: Duration,
    },
    WrongStatus {
        code: u16,
    },
    Timeout,
    ConnectionFailure,
    OtherError {
        detail: String,
    },
}

impl ProbeOutcome {
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up { .. })
    }

    /// Stable label used in logs, metrics and the API.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Up { .. } => "up",
            Self::WrongStatus { .. } => "wrong_status",
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection_failure",
            Self::OtherError { .. } => "other_error",
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            Self::Up { latency } => Some(*latency),
            _ => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up { latency } => write!(f, "UP ({:.3}s)", latency.as_secs_f64()),
            Self::WrongStatus { code } => write!(f, "DOWN (status {})", code),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ConnectionFailure => write!(f, "UNREACHABLE"),
            Self::OtherError { detail } => write!(f, "ERROR ({})", detail),
        }
    }
}

/// What the transport layer observed for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Response { status: u16, elapsed: Duration },
    ConnectFailed,
    TimedOut,
    Failed(String),
}

/// Maps a transport observation onto the outcome taxonomy.
///
/// Only an exact 200 counts as healthy: other 2xx codes and any final 3xx are
/// reported as [`ProbeOutcome::WrongStatus`].
pub fn classify(transport: Transport) -> ProbeOutcome {
    match transport {
        Transport::ConnectFailed => ProbeOutcome::ConnectionFailure,
        Transport::TimedOut => ProbeOutcome::Timeout,
        Transport::Failed(detail) => ProbeOutcome::OtherError { detail },
        Transport::Response { status: 200, elapsed } => ProbeOutcome::Up { latency: elapsed },
        Transport::Response { status, .. } => ProbeOutcome::WrongStatus { code: status },
    }
}

/// Performs exactly one GET against a URL and classifies the result.
///
/// Implementations must return within `timeout` (plus scheduling slack) and
/// must not retry. The trait is object-safe so the monitor loop can be driven
/// by fakes.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> Transport {
        Transport::Response {
            status,
            elapsed: Duration::from_millis(120),
        }
    }

    #[test]
    fn exact_200_is_up() {
        assert_eq!(
            classify(response(200)),
            ProbeOutcome::Up {
                latency: Duration::from_millis(120)
            }
        );
    }

    #[test]
    fn other_success_and_redirect_codes_are_wrong_status() {
        for code in [201, 204, 299, 301, 302, 304] {
            assert_eq!(classify(response(code)), ProbeOutcome::WrongStatus { code });
        }
    }

    #[test]
    fn error_codes_keep_exact_value() {
        assert_eq!(classify(response(503)), ProbeOutcome::WrongStatus { code: 503 });
        assert_eq!(classify(response(404)), ProbeOutcome::WrongStatus { code: 404 });
    }

    #[test]
    fn transport_failures_map_to_their_variants() {
        assert_eq!(classify(Transport::ConnectFailed), ProbeOutcome::ConnectionFailure);
        assert_eq!(classify(Transport::TimedOut), ProbeOutcome::Timeout);
        assert_eq!(
            classify(Transport::Failed("invalid certificate".into())),
            ProbeOutcome::OtherError {
                detail: "invalid certificate".into()
            }
        );
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let up = ProbeOutcome::Up {
            latency: Duration::from_millis(250),
        };
        let json = serde_json::to_value(&up).unwrap();
        assert_eq!(json["status"], "up");
        assert_eq!(json["latency_secs"], 0.25);

        let down = serde_json::to_value(ProbeOutcome::WrongStatus { code: 503 }).unwrap();
        assert_eq!(down["status"], "wrong_status");
        assert_eq!(down["code"], 503);

        let timeout = serde_json::to_value(ProbeOutcome::Timeout).unwrap();
        assert_eq!(timeout["status"], "timeout");
    }

    #[test]
    fn display_is_short() {
        assert_eq!(ProbeOutcome::WrongStatus { code: 500 }.to_string(), "DOWN (status 500)");
        assert_eq!(ProbeOutcome::ConnectionFailure.to_string(), "UNREACHABLE");
        assert_eq!(
            ProbeOutcome::Up {
                latency: Duration::from_millis(1500)
            }
            .to_string(),
            "UP (1.500s)"
        );
    }
}
