use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notifier::DeliveryResult;
use crate::probe::ProbeOutcome;
use crate::target::Target;

/// One target's entry in a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub target: Target,
    pub outcome: ProbeOutcome,
    /// Present exactly when the outcome is not `Up`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryResult>,
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn delivery_failed(&self) -> bool {
        self.delivery.as_ref().is_some_and(|d| !d.success)
    }
}

/// Everything one pass over the targets produced, in target order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<CheckResult>,
    /// Set when the cycle stopped before reaching every target.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn up_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_up()).count()
    }

    pub fn down_count(&self) -> usize {
        self.results.len() - self.up_count()
    }

    pub fn deliveries_failed(&self) -> usize {
        self.results.iter().filter(|r| r.delivery_failed()).count()
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            id: self.id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            checked: self.results.len(),
            up: self.up_count(),
            down: self.down_count(),
            deliveries_failed: self.deliveries_failed(),
            cancelled: self.cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub up: usize,
    pub down: usize,
    pub deliveries_failed: usize,
    pub cancelled: bool,
}
