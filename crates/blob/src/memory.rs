use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use watify_core::ObjectCreated;

use crate::error::BlobError;
use crate::store::{ObjectStore, join_public_url};
use crate::types::{PutObject, StoredObject};

/// Base URL used by [`MemoryObjectStore::new`].
pub const DEFAULT_MEMORY_BASE_URL: &str = "memory://blobs";

/// Buffered creations per subscriber before the slowest one lags.
const CHANGE_FEED_CAPACITY: usize = 1024;

/// In-memory [`ObjectStore`] backed by a [`DashMap`].
///
/// Intended for tests and local development. Writes can be switched to fail
/// with [`set_read_only`](Self::set_read_only) to exercise error paths.
/// Every successful write is published on the feed returned by
/// [`ObjectStore::subscribe`].
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: DashMap<String, PutObject>,
    base_url: String,
    read_only: AtomicBool,
    changes: broadcast::Sender<ObjectCreated>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_MEMORY_BASE_URL)
    }
}

impl MemoryObjectStore {
    /// Create an empty store serving objects under [`DEFAULT_MEMORY_BASE_URL`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store serving objects under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            objects: DashMap::new(),
            base_url: base_url.into(),
            read_only: AtomicBool::new(false),
            changes: broadcast::channel(CHANGE_FEED_CAPACITY).0,
        }
    }

    /// Reject every subsequent write with [`BlobError::Storage`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    /// Whether an object exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Whether the object under `key` was stored public-read.
    pub fn is_public(&self, key: &str) -> Option<bool> {
        self.objects.get(key).map(|o| o.public_read)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, object: PutObject) -> Result<(), BlobError> {
        if self.read_only.load(Ordering::Relaxed) {
            return Err(BlobError::Storage(format!(
                "store is read-only, rejected write of {}",
                object.key
            )));
        }
        let created = ObjectCreated {
            size: Some(object.body.len() as u64),
            ..ObjectCreated::new(object.key.clone())
        };
        self.objects.insert(object.key.clone(), object);
        // No subscribers is fine.
        let _ = self.changes.send(created);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, BlobError> {
        let object = self
            .objects
            .get(key)
            .ok_or_else(|| BlobError::NotFound(key.to_owned()))?;
        Ok(StoredObject {
            key: object.key.clone(),
            body: object.body.clone(),
            content_type: Some(object.content_type.clone()),
            metadata: object.metadata.clone(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(&self.base_url, key)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ObjectCreated>> {
        Some(self.changes.subscribe())
    }
}
