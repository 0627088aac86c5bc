use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use uptime_core::{CheckResult, CycleReport, CycleSummary, Monitor};

/// Shared server state: the monitor plus the latest result per target.
///
/// Nothing here outlives the process; only the most recent cycle is kept.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub latest: Arc<DashMap<String, CheckResult>>,
    pub last_cycle: Arc<RwLock<Option<CycleSummary>>>,
    pub cycles_total: Arc<AtomicU64>,
    cycle_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self {
            monitor,
            latest: Arc::new(DashMap::new()),
            last_cycle: Arc::new(RwLock::new(None)),
            cycles_total: Arc::new(AtomicU64::new(0)),
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one cycle and records it. Returns `None` if a cycle is already running.
    pub async fn try_run_cycle(&self) -> Option<CycleReport> {
        let _guard = self.cycle_lock.try_lock().ok()?;
        let report = self.monitor.run_cycle().await;
        self.record(&report).await;
        Some(report)
    }

    /// Runs one cycle, waiting for any cycle already in progress to finish first.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        let report = self.monitor.run_cycle().await;
        self.record(&report).await;
        report
    }

    pub async fn record(&self, report: &CycleReport) {
        for result in &report.results {
            self.latest.insert(result.target.id.clone(), result.clone());
        }
        *self.last_cycle.write().await = Some(report.summary());
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Latest results in configured target order; unchecked targets are skipped.
    pub fn latest_results(&self) -> Vec<CheckResult> {
        self.monitor
            .targets()
            .iter()
            .filter_map(|t| self.latest.get(&t.id).map(|r| r.value().clone()))
            .collect()
    }

    pub fn cycles_total(&self) -> u64 {
        self.cycles_total.load(Ordering::Relaxed)
    }
}
