use std::sync::Arc;

use tracing::{info, instrument};

use watify_core::WatRecord;
use watify_state::{DEFAULT_RECENT_LIMIT, RecordStore};

use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;

/// Accepts submitted URLs and serves the recent-wats listing.
#[derive(Clone)]
pub struct IngestStage {
    store: Arc<dyn RecordStore>,
    metrics: Arc<PipelineMetrics>,
    recent_limit: usize,
}

impl IngestStage {
    pub fn new(store: Arc<dyn RecordStore>, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            store,
            metrics,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    /// Override how many records [`recent`](Self::recent) returns.
    #[must_use]
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Queue `url`, overwriting any earlier record for it.
    ///
    /// The value is stored as given, since it is both the record key and the
    /// source of the blob name. Only empty input is rejected; unreachable or
    /// malformed URLs fail later in the download stage.
    #[instrument(name = "ingest.create", skip(self))]
    pub async fn create(&self, url: &str) -> Result<WatRecord, PipelineError> {
        if url.is_empty() {
            return Err(PipelineError::InvalidInput("url must not be empty".into()));
        }
        let record = self.store.insert(url).await?;
        self.metrics.increment_records_created();
        info!(url = %record.url, "wat queued");
        Ok(record)
    }

    /// Today's records, newest first.
    pub async fn recent(&self) -> Result<Vec<WatRecord>, PipelineError> {
        Ok(self.store.query_recent(self.recent_limit).await?)
    }
}
