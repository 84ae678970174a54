use async_trait::async_trait;
use tokio::sync::broadcast;
use watify_core::ObjectCreated;

use crate::error::BlobError;
use crate::types::{PutObject, StoredObject};

/// Raw object storage backend.
///
/// Implementors provide the actual storage mechanism (e.g. S3 or memory).
/// Keys are full object paths such as `original/<sha1>.jpg`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, overwriting any object with the same key.
    async fn put(&self, object: PutObject) -> Result<(), BlobError>;

    /// Read an object. Fails with [`BlobError::NotFound`] when absent.
    async fn get(&self, key: &str) -> Result<StoredObject, BlobError>;

    /// Public URL under which `key` is served.
    fn public_url(&self, key: &str) -> String;

    /// In-process feed of object creations, when the backend has one.
    fn subscribe(&self) -> Option<broadcast::Receiver<ObjectCreated>> {
        None
    }
}

/// Join a base URL and an object key with exactly one `/` between them.
pub fn join_public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_slashes() {
        assert_eq!(
            join_public_url("https://s3.amazonaws.com/wats/", "original/a.jpg"),
            "https://s3.amazonaws.com/wats/original/a.jpg"
        );
        assert_eq!(
            join_public_url("http://localhost:9000/wats", "/watified/a.jpg"),
            "http://localhost:9000/wats/watified/a.jpg"
        );
    }
}
