//! The three Watify stages.
//!
//! * [`IngestStage`] queues submitted URLs.
//! * [`DownloadStage`] reacts to record changes, fetches queued originals and
//!   archives them.
//! * [`WatifyStage`] reacts to archived originals, composites the overlay and
//!   completes the record.
//!
//! Stages are driven by change notifications and never call each other.
//! Each batch handler returns a [`BatchReport`]; per-item failures are
//! recorded in the report and as a best-effort `error` status, never
//! propagated.

pub mod builder;
pub mod download;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod ingest;
pub mod metrics;
pub mod report;
mod recover;
pub mod testing;
pub mod watify;

pub use builder::{Pipeline, PipelineBuilder};
pub use download::DownloadStage;
pub use error::{FetchError, PipelineError};
pub use fetch::{DEFAULT_FETCH_TIMEOUT, Fetcher, HttpFetcher};
pub use ingest::IngestStage;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use report::{BatchReport, ItemOutcome, ItemReport};
pub use watify::WatifyStage;
