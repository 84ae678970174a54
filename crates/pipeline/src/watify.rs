use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use watify_blob::WatBlobStore;
use watify_compositor::Compositor;
use watify_core::{ObjectCreated, ParsedBatch, is_original_key, parse_object_notification};
use watify_state::RecordStore;

use crate::error::PipelineError;
use crate::feed::{MAX_FEED_BATCH, next_batch};
use crate::metrics::{PipelineMetrics, Stage};
use crate::recover::record_error;
use crate::report::{BatchReport, ItemOutcome};

/// Composites archived originals and completes their records.
#[derive(Clone)]
pub struct WatifyStage {
    store: Arc<dyn RecordStore>,
    blobs: WatBlobStore,
    compositor: Compositor,
    metrics: Arc<PipelineMetrics>,
}

impl WatifyStage {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: WatBlobStore,
        compositor: Compositor,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            blobs,
            compositor,
            metrics,
        }
    }

    /// Handle changes from an in-process object feed until it closes.
    pub fn spawn_feed(&self, mut feed: broadcast::Receiver<ObjectCreated>) -> JoinHandle<()> {
        let stage = self.clone();
        tokio::spawn(async move {
            while let Some(batch) = next_batch(&mut feed, MAX_FEED_BATCH).await {
                stage.handle(batch.into_iter().map(Ok).collect()).await;
            }
            debug!("object feed closed");
        })
    }

    /// Parse an object notification payload and process it.
    ///
    /// Fails only when the envelope itself is malformed.
    pub async fn handle_notification(&self, payload: &Value) -> Result<BatchReport, PipelineError> {
        let batch = parse_object_notification(payload)?;
        Ok(self.handle(batch).await)
    }

    /// Process one batch of object creations in delivery order.
    ///
    /// Objects outside the `original/` namespace are ignored, which includes
    /// the watified copies this stage writes to the same bucket.
    #[instrument(name = "watify.batch", skip_all, fields(items = batch.len()))]
    pub async fn handle(&self, batch: ParsedBatch<ObjectCreated>) -> BatchReport {
        let mut report = BatchReport::default();

        for item in batch {
            let object = match item {
                Ok(object) => object,
                Err(err) => {
                    error!(error = %err, "rejecting malformed object notification");
                    report.push(None, ItemOutcome::Rejected { error: err.to_string() });
                    continue;
                }
            };

            if !is_original_key(&object.key) {
                debug!(key = %object.key, "ignoring object outside original namespace");
                report.push(
                    Some(object.key),
                    ItemOutcome::Ignored {
                        reason: "not an original".to_owned(),
                    },
                );
                continue;
            }

            let outcome = self.process(&object.key).await;
            report.push(Some(object.key), outcome);
        }

        self.metrics.record_batch(Stage::Watify, &report);
        report
    }

    async fn process(&self, key: &str) -> ItemOutcome {
        let mut source_url: Option<String> = None;
        match self.watify(key, &mut source_url).await {
            Ok(()) => ItemOutcome::Completed,
            Err(err) => {
                error!(key = %key, error = %err, "watify failed");
                let error_recorded = match source_url.as_deref() {
                    Some(url) => record_error(self.store.as_ref(), url).await,
                    None => {
                        warn!(key = %key, "source url unknown, no record to mark as failed");
                        false
                    }
                };
                ItemOutcome::Failed {
                    error: err.to_string(),
                    error_recorded,
                }
            }
        }
    }

    /// Composite the original at `key`. `source_url` is filled in as soon
    /// as it is known so that failures after that point can be attributed.
    #[instrument(name = "watify.item", skip(self, source_url))]
    async fn watify(&self, key: &str, source_url: &mut Option<String>) -> Result<(), PipelineError> {
        let (original, url) = self.blobs.get_original(key).await?;
        let url = source_url.insert(url);

        let composited = self.composite(original).await?;
        let public_url = self.blobs.put_watified(key, composited).await?;
        self.store.complete(url, &public_url).await?;

        info!(url = %url, watified_url = %public_url, "wat completed");
        Ok(())
    }

    /// Run the compositor on a blocking worker thread.
    async fn composite(&self, original: Bytes) -> Result<Bytes, PipelineError> {
        let compositor = self.compositor.clone();
        let result = tokio::task::spawn_blocking(move || compositor.composite(&original))
            .await
            .map_err(|e| PipelineError::Decode(format!("compositing task failed: {e}")))?;
        Ok(Bytes::from(result?))
    }
}
