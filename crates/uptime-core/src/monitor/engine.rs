use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alert::format_alert;
use crate::config::MonitorConfig;
use crate::error::ConfigError;
use crate::monitor::report::{CheckResult, CycleReport};
use crate::notifier::Notifier;
use crate::probe::Prober;
use crate::target::{validate_targets, Target};

/// Stops a monitor between targets. Once cancelled, it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Monitor {
    config: MonitorConfig,
    targets: Arc<Vec<Target>>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    cancel: CancelHandle,
}

impl Monitor {
    pub fn new(
        targets: Vec<Target>,
        config: MonitorConfig,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        validate_targets(&targets)?;
        config.validate()?;

        Ok(Self {
            config,
            targets: Arc::new(targets),
            prober,
            notifier,
            cancel: CancelHandle::default(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Checks every target once and alerts on each failure.
    ///
    /// Up to `max_concurrent_probes` targets are in flight at a time, but the
    /// results always follow target order.
    pub async fn run_cycle(&self) -> CycleReport {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let timeout = self.config.request_timeout;

        debug!(cycle_id = %id, targets = self.targets.len(), "Starting check cycle");

        // Each check owns its inputs so the cycle future stays `Send`.
        let checks: Vec<_> = self
            .targets
            .iter()
            .cloned()
            .map(|target| {
                let prober = Arc::clone(&self.prober);
                let notifier = Arc::clone(&self.notifier);
                let cancel = self.cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(check_target(&target, timeout, &*prober, &*notifier).await)
                }
            })
            .collect();

        let outcomes: Vec<Option<CheckResult>> = stream::iter(checks)
            .buffered(self.config.max_concurrent_probes.max(1))
            .collect()
            .await;
        // Cancellation is sticky, so everything after the first skipped target was skipped too.
        let results: Vec<CheckResult> = outcomes.into_iter().map_while(|r| r).collect();

        let cancelled = results.len() < self.targets.len();
        let report = CycleReport {
            id,
            started_at,
            finished_at: Utc::now(),
            results,
            cancelled,
        };

        if cancelled {
            warn!(
                cycle_id = %id,
                checked = report.results.len(),
                skipped = self.targets.len() - report.results.len(),
                "Check cycle cancelled"
            );
        } else {
            info!(
                cycle_id = %id,
                up = report.up_count(),
                down = report.down_count(),
                deliveries_failed = report.deliveries_failed(),
                "Check cycle finished"
            );
        }

        report
    }
}

/// Sequential cycle over `targets`: one entry per target, in input order.
///
/// A failing target or a failed delivery never stops the remaining targets.
pub async fn run_cycle(
    targets: &[Target],
    timeout: Duration,
    prober: &dyn Prober,
    notifier: &dyn Notifier,
) -> Vec<CheckResult> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        results.push(check_target(target, timeout, prober, notifier).await);
    }
    results
}

/// Probes one target and, if it is not up, sends exactly one alert.
pub async fn check_target(
    target: &Target,
    timeout: Duration,
    prober: &dyn Prober,
    notifier: &dyn Notifier,
) -> CheckResult {
    let checked_at = Utc::now();
    let outcome = prober.probe(&target.url, timeout).await;

    let delivery = match format_alert(target, &outcome, timeout) {
        None => {
            info!(
                target_id = %target.id,
                url = %target.url,
                latency_ms = outcome.latency().map(|l| l.as_millis() as u64).unwrap_or(0),
                "Target is up"
            );
            None
        }
        Some(alert) => {
            warn!(
                target_id = %target.id,
                url = %target.url,
                outcome = %outcome,
                "Target check failed"
            );

            let result = notifier.send(&alert.text).await;
            if result.success {
                debug!(target_id = %target.id, severity = %alert.severity, "Alert delivered");
            } else {
                warn!(
                    target_id = %target.id,
                    status = ?result.status_code,
                    detail = result.detail.as_deref().unwrap_or(""),
                    "Alert delivery failed"
                );
            }
            Some(result)
        }
    };

    CheckResult {
        target: target.clone(),
        outcome,
        delivery,
        checked_at,
    }
}
