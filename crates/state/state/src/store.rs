use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast;

use watify_core::{RecordChange, WatRecord, WatStatus};

use crate::error::StateError;

/// Number of records shown on the recent-wats listing.
pub const DEFAULT_RECENT_LIMIT: usize = 30;

/// Typed access to the wat record store.
///
/// Records are keyed by URL. Backends must also maintain a secondary access
/// path partitioned by `created_at_date` and ordered by `created_at_time`,
/// since the URL key cannot answer chronological queries.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write `record`, overwriting any existing record with the same URL.
    async fn put(&self, record: &WatRecord) -> Result<(), StateError>;

    /// Read the record for `url`. Returns `None` if absent.
    async fn get(&self, url: &str) -> Result<Option<WatRecord>, StateError>;

    /// Set the status of an existing record.
    ///
    /// Fails with [`StateError::NotFound`] when no record exists for `url`
    /// and with [`StateError::InvalidTransition`] when the current status
    /// does not allow moving to `status`.
    async fn update_status(&self, url: &str, status: WatStatus) -> Result<(), StateError>;

    /// Atomically mark a record completed and attach its watified URL.
    ///
    /// Same failure rules as [`update_status`](Self::update_status).
    async fn complete(&self, url: &str, watified_url: &str) -> Result<(), StateError>;

    /// Records created on `date`, newest first, at most `limit` of them.
    async fn query_by_date(
        &self,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<WatRecord>, StateError>;

    /// Queue `url`: write a fresh record created now with status `queued`.
    async fn insert(&self, url: &str) -> Result<WatRecord, StateError> {
        let record = WatRecord::queued(url, Utc::now());
        self.put(&record).await?;
        Ok(record)
    }

    /// Records created today (UTC), newest first, at most `limit` of them.
    async fn query_recent(&self, limit: usize) -> Result<Vec<WatRecord>, StateError> {
        self.query_by_date(Utc::now().date_naive(), limit).await
    }

    /// In-process feed of record changes.
    ///
    /// Backends whose changes are delivered by external infrastructure (a
    /// DynamoDB stream, say) return `None`.
    fn subscribe(&self) -> Option<broadcast::Receiver<RecordChange>> {
        None
    }
}
