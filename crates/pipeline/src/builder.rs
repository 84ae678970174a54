use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use watify_blob::{ObjectStore, WatBlobStore};
use watify_compositor::Compositor;
use watify_state::{DEFAULT_RECENT_LIMIT, RecordStore};

use crate::download::DownloadStage;
use crate::error::PipelineError;
use crate::fetch::{DEFAULT_FETCH_TIMEOUT, Fetcher, HttpFetcher};
use crate::ingest::IngestStage;
use crate::metrics::PipelineMetrics;
use crate::watify::WatifyStage;

/// Fluent builder for a [`Pipeline`].
///
/// A record store, an object store and a compositor are required. Without
/// an explicit fetcher an [`HttpFetcher`] with the configured fetch timeout
/// is used.
pub struct PipelineBuilder {
    store: Option<Arc<dyn RecordStore>>,
    objects: Option<Arc<dyn ObjectStore>>,
    compositor: Option<Compositor>,
    fetcher: Option<Arc<dyn Fetcher>>,
    fetch_timeout: Duration,
    recent_limit: usize,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            objects: None,
            compositor: None,
            fetcher: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    /// Set the record store implementation.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the object store holding originals and watified images.
    #[must_use]
    pub fn objects(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    /// Set the compositor used by the watify stage.
    #[must_use]
    pub fn compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = Some(compositor);
        self
    }

    /// Replace the default HTTP fetcher.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Timeout of the default HTTP fetcher.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Number of records on the recent-wats listing.
    #[must_use]
    pub fn recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Build the pipeline, wiring every stage to the shared stores.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let store = self
            .store
            .ok_or_else(|| PipelineError::Configuration("record store is required".into()))?;
        let objects = self
            .objects
            .ok_or_else(|| PipelineError::Configuration("object store is required".into()))?;
        let compositor = self
            .compositor
            .ok_or_else(|| PipelineError::Configuration("compositor is required".into()))?;
        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(self.fetch_timeout)?),
        };

        let metrics = Arc::new(PipelineMetrics::default());
        let blobs = WatBlobStore::new(Arc::clone(&objects));

        Ok(Pipeline {
            ingest: IngestStage::new(Arc::clone(&store), Arc::clone(&metrics))
                .with_recent_limit(self.recent_limit),
            download: DownloadStage::new(
                Arc::clone(&store),
                blobs.clone(),
                fetcher,
                Arc::clone(&metrics),
            ),
            watify: WatifyStage::new(Arc::clone(&store), blobs, compositor, Arc::clone(&metrics)),
            metrics,
            store,
            objects,
        })
    }
}

/// The assembled stages sharing one set of stores and metrics.
#[derive(Clone)]
pub struct Pipeline {
    ingest: IngestStage,
    download: DownloadStage,
    watify: WatifyStage,
    metrics: Arc<PipelineMetrics>,
    store: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn ingest(&self) -> &IngestStage {
        &self.ingest
    }

    pub fn download(&self) -> &DownloadStage {
        &self.download
    }

    pub fn watify(&self) -> &WatifyStage {
        &self.watify
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Drive the download and watify stages from the stores' in-process
    /// change feeds.
    ///
    /// Stores without a feed are skipped; their notifications arrive through
    /// the event endpoints instead. Returns the spawned dispatchers.
    pub fn spawn_change_feeds(&self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(feed) = self.store.subscribe() {
            info!("dispatching record changes to the download stage");
            tasks.push(self.download.spawn_feed(feed));
        }
        if let Some(feed) = self.objects.subscribe() {
            info!("dispatching object creations to the watify stage");
            tasks.push(self.watify.spawn_feed(feed));
        }
        tasks
    }
}
