pub mod engine;
pub mod report;

pub use engine::{check_target, run_cycle, CancelHandle, Monitor};
pub use report::{CheckResult, CycleReport, CycleSummary};
