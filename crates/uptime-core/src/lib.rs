#![forbid(unsafe_code)]

pub mod alert;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notifier;
pub mod probe;
pub mod target;

pub use alert::{format_alert, AlertMessage, Severity};
pub use config::MonitorConfig;
pub use error::ConfigError;
pub use monitor::{check_target, run_cycle, CancelHandle, CheckResult, CycleReport, CycleSummary, Monitor};
pub use notifier::{DeliveryResult, Notifier, WebhookConfig, WebhookNotifier, WebhookPayload};
pub use probe::{classify, HttpProber, ProbeOutcome, Prober, Transport};
pub use target::Target;
