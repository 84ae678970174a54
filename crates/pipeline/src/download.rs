use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use watify_blob::WatBlobStore;
use watify_core::{ParsedBatch, RecordChange, WatStatus, filename_for_url, parse_record_stream};
use watify_state::RecordStore;

use crate::error::PipelineError;
use crate::feed::{MAX_FEED_BATCH, next_batch};
use crate::fetch::Fetcher;
use crate::metrics::{PipelineMetrics, Stage};
use crate::recover::record_error;
use crate::report::{BatchReport, ItemOutcome};

/// Fetches newly queued originals and archives them in the blob store.
#[derive(Clone)]
pub struct DownloadStage {
    store: Arc<dyn RecordStore>,
    blobs: WatBlobStore,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<PipelineMetrics>,
}

impl DownloadStage {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: WatBlobStore,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            blobs,
            fetcher,
            metrics,
        }
    }

    /// Handle changes from an in-process record feed until it closes.
    pub fn spawn_feed(&self, mut feed: broadcast::Receiver<RecordChange>) -> JoinHandle<()> {
        let stage = self.clone();
        tokio::spawn(async move {
            while let Some(batch) = next_batch(&mut feed, MAX_FEED_BATCH).await {
                stage.handle(batch.into_iter().map(Ok).collect()).await;
            }
            debug!("record feed closed");
        })
    }

    /// Parse a record stream payload and process it.
    ///
    /// Fails only when the envelope itself is malformed.
    pub async fn handle_notification(&self, payload: &Value) -> Result<BatchReport, PipelineError> {
        let batch = parse_record_stream(payload)?;
        Ok(self.handle(batch).await)
    }

    /// Process one batch of record changes in delivery order.
    ///
    /// Only changes that leave a record `queued` are acted on; everything
    /// else, including this stage's own status writes, is ignored.
    #[instrument(name = "download.batch", skip_all, fields(items = batch.len()))]
    pub async fn handle(&self, batch: ParsedBatch<RecordChange>) -> BatchReport {
        let mut report = BatchReport::default();

        for item in batch {
            let change = match item {
                Ok(change) => change,
                Err(err) => {
                    error!(error = %err, "rejecting malformed record change");
                    report.push(None, ItemOutcome::Rejected { error: err.to_string() });
                    continue;
                }
            };

            if !change.is_queued() {
                let reason = match change.new_status {
                    Some(status) => format!("status is {status}"),
                    None => "record removed".to_owned(),
                };
                debug!(url = %change.url, reason = %reason, "ignoring record change");
                report.push(Some(change.url), ItemOutcome::Ignored { reason });
                continue;
            }

            let outcome = self.process(&change.url).await;
            report.push(Some(change.url), outcome);
        }

        self.metrics.record_batch(Stage::Download, &report);
        report
    }

    async fn process(&self, url: &str) -> ItemOutcome {
        match self.download(url).await {
            Ok(()) => ItemOutcome::Completed,
            Err(PipelineError::StaleTransition { from, .. }) => {
                info!(url = %url, status = %from, "record already moved on, keeping its status");
                ItemOutcome::Superseded
            }
            Err(err) => {
                error!(url = %url, error = %err, "download failed");
                let error_recorded = record_error(self.store.as_ref(), url).await;
                ItemOutcome::Failed {
                    error: err.to_string(),
                    error_recorded,
                }
            }
        }
    }

    #[instrument(name = "download.item", skip(self))]
    async fn download(&self, url: &str) -> Result<(), PipelineError> {
        let bytes = self.fetcher.fetch(url).await?;
        let filename = filename_for_url(url);
        let stored = self.blobs.put_original(&filename, bytes, url).await?;
        debug!(key = %stored.key, public_url = %stored.public_url, "original archived");

        self.store.update_status(url, WatStatus::Downloaded).await?;
        info!(url = %url, key = %stored.key, "wat downloaded");
        Ok(())
    }
}
