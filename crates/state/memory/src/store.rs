use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::broadcast;

use watify_core::{ChangeKind, RecordChange, WatRecord, WatStatus};
use watify_state::error::StateError;
use watify_state::store::RecordStore;

/// In-memory [`RecordStore`] backed by [`DashMap`]s.
///
/// Records are keyed by URL. A second map keeps, per creation date, the
/// `(created_at_time, url)` pairs in sorted order so that date queries are
/// served without scanning every record.
///
/// Lock order is always records first, then the date index.
///
/// Writes that change a record are published on the feed returned by
/// [`RecordStore::subscribe`]. Writes that leave a record as it was publish
/// nothing.
#[derive(Debug)]
pub struct MemoryRecordStore {
    records: DashMap<String, WatRecord>,
    by_date: DashMap<NaiveDate, BTreeSet<(i64, String)>>,
    changes: broadcast::Sender<RecordChange>,
}

/// Buffered changes per subscriber before the slowest one lags.
const CHANGE_FEED_CAPACITY: usize = 1024;

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            by_date: DashMap::new(),
            changes: broadcast::channel(CHANGE_FEED_CAPACITY).0,
        }
    }
}

impl MemoryRecordStore {
    /// Create a new, empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn unindex(&self, record: &WatRecord) {
        if let Some(mut entries) = self.by_date.get_mut(&record.created_at_date) {
            entries.remove(&(record.created_at_time, record.url.clone()));
        }
    }

    fn index(&self, record: &WatRecord) {
        self.by_date
            .entry(record.created_at_date)
            .or_default()
            .insert((record.created_at_time, record.url.clone()));
    }

    fn publish(&self, kind: ChangeKind, record: &WatRecord) {
        // No subscribers is fine.
        let _ = self
            .changes
            .send(RecordChange::new(kind, record.url.clone(), Some(record.status)));
    }

    /// Apply `mutate` to the record for `url` if `status` is reachable from
    /// its current status.
    fn transition(
        &self,
        url: &str,
        status: WatStatus,
        mutate: impl FnOnce(&mut WatRecord),
    ) -> Result<(), StateError> {
        let changed = {
            let mut record = self
                .records
                .get_mut(url)
                .ok_or_else(|| StateError::NotFound(url.to_owned()))?;

            if !record.status.can_transition_to(status) {
                return Err(StateError::InvalidTransition {
                    from: record.status,
                    to: status,
                });
            }
            let before = record.clone();
            record.status = status;
            mutate(&mut record);
            (*record != before).then(|| record.clone())
        };
        if let Some(record) = changed {
            self.publish(ChangeKind::Modify, &record);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &WatRecord) -> Result<(), StateError> {
        // Holding the entry keeps concurrent puts of the same URL from
        // interleaving their index updates.
        let kind = match self.records.entry(record.url.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get() == record {
                    None
                } else {
                    self.unindex(occupied.get());
                    self.index(record);
                    occupied.insert(record.clone());
                    Some(ChangeKind::Modify)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                self.index(record);
                vacant.insert(record.clone());
                Some(ChangeKind::Insert)
            }
        };
        if let Some(kind) = kind {
            self.publish(kind, record);
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<WatRecord>, StateError> {
        Ok(self.records.get(url).map(|r| r.value().clone()))
    }

    async fn update_status(&self, url: &str, status: WatStatus) -> Result<(), StateError> {
        self.transition(url, status, |_| {})
    }

    async fn complete(&self, url: &str, watified_url: &str) -> Result<(), StateError> {
        self.transition(url, WatStatus::Completed, |record| {
            record.watified_url = Some(watified_url.to_owned());
        })
    }

    async fn query_by_date(
        &self,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<WatRecord>, StateError> {
        // Collect keys and release the index guard before touching records.
        let urls: Vec<String> = match self.by_date.get(&date) {
            Some(entries) => entries
                .iter()
                .rev()
                .take(limit)
                .map(|(_, url)| url.clone())
                .collect(),
            None => return Ok(Vec::new()),
        };

        Ok(urls
            .iter()
            .filter_map(|url| self.records.get(url).map(|r| r.value().clone()))
            .filter(|r| r.created_at_date == date)
            .collect())
    }
}
