use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::report::{BatchReport, ItemOutcome};

/// Atomic counters tracking pipeline outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Records queued through the ingestion stage.
    pub records_created: AtomicU64,
    /// Originals archived by the download stage.
    pub downloads_completed: AtomicU64,
    /// Download items that failed.
    pub downloads_failed: AtomicU64,
    /// Records completed by the watify stage.
    pub watify_completed: AtomicU64,
    /// Watify items that failed.
    pub watify_failed: AtomicU64,
    /// Notifications skipped as not relevant to the stage.
    pub events_ignored: AtomicU64,
    /// Notifications that could not be parsed.
    pub events_rejected: AtomicU64,
    /// Download items overtaken by the watify stage.
    pub superseded: AtomicU64,
    /// Failed items whose `error` status could not be written.
    pub error_status_unrecorded: AtomicU64,
}

/// Which stage a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Download,
    Watify,
}

impl PipelineMetrics {
    /// Increment the records-created counter.
    pub fn increment_records_created(&self) {
        self.records_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold every item of `report` into the counters.
    pub(crate) fn record_batch(&self, stage: Stage, report: &BatchReport) {
        for item in &report.items {
            let counter = match (&item.outcome, stage) {
                (ItemOutcome::Completed, Stage::Download) => &self.downloads_completed,
                (ItemOutcome::Completed, Stage::Watify) => &self.watify_completed,
                (ItemOutcome::Ignored { .. }, _) => &self.events_ignored,
                (ItemOutcome::Rejected { .. }, _) => &self.events_rejected,
                (ItemOutcome::Superseded, _) => &self.superseded,
                (ItemOutcome::Failed { error_recorded, .. }, stage) => {
                    if !error_recorded {
                        self.error_status_unrecorded.fetch_add(1, Ordering::Relaxed);
                    }
                    match stage {
                        Stage::Download => &self.downloads_failed,
                        Stage::Watify => &self.watify_failed,
                    }
                }
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_created: self.records_created.load(Ordering::Relaxed),
            downloads_completed: self.downloads_completed.load(Ordering::Relaxed),
            downloads_failed: self.downloads_failed.load(Ordering::Relaxed),
            watify_completed: self.watify_completed.load(Ordering::Relaxed),
            watify_failed: self.watify_failed.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            error_status_unrecorded: self.error_status_unrecorded.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`PipelineMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_created: u64,
    pub downloads_completed: u64,
    pub downloads_failed: u64,
    pub watify_completed: u64,
    pub watify_failed: u64,
    pub events_ignored: u64,
    pub events_rejected: u64,
    pub superseded: u64,
    pub error_status_unrecorded: u64,
}
