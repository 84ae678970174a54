//! Blob store adapter for the two wat object classes.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use watify_core::{SOURCE_URL_METADATA, is_original_key, original_key, watified_key};

use crate::error::BlobError;
use crate::store::ObjectStore;
use crate::types::{PutObject, StoredOriginal};

/// Content type of every stored wat object.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Typed access to archived originals and their watified copies.
///
/// Both classes are written public-read as `image/jpeg`. Originals carry the
/// source URL in their `original_url` metadata so the watify stage can find
/// the record to complete.
#[derive(Clone)]
pub struct WatBlobStore {
    objects: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for WatBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatBlobStore").finish_non_exhaustive()
    }
}

impl WatBlobStore {
    /// Wrap a raw object store.
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// The underlying object store.
    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    /// Archive an original under `original/<filename>`.
    pub async fn put_original(
        &self,
        filename: &str,
        bytes: Bytes,
        source_url: &str,
    ) -> Result<StoredOriginal, BlobError> {
        let key = original_key(filename);
        debug!(key = %key, size = bytes.len(), "storing original");
        self.objects
            .put(
                PutObject::new(key.clone(), bytes, JPEG_CONTENT_TYPE)
                    .public()
                    .with_metadata(SOURCE_URL_METADATA, source_url),
            )
            .await?;
        let public_url = self.objects.public_url(&key);
        Ok(StoredOriginal { key, public_url })
    }

    /// Publish the watified copy of the original at `key` under
    /// `watified/<basename(key)>` and return its public URL.
    pub async fn put_watified(&self, key: &str, bytes: Bytes) -> Result<String, BlobError> {
        let target = watified_key(key);
        debug!(key = %target, size = bytes.len(), "storing watified image");
        self.objects
            .put(PutObject::new(target.clone(), bytes, JPEG_CONTENT_TYPE).public())
            .await?;
        Ok(self.objects.public_url(&target))
    }

    /// Read the original at `key` together with its source URL.
    pub async fn get_original(&self, key: &str) -> Result<(Bytes, String), BlobError> {
        if !is_original_key(key) {
            return Err(BlobError::InvalidKey(key.to_owned()));
        }
        let object = self.objects.get(key).await?;
        let source_url = object
            .metadata
            .get(SOURCE_URL_METADATA)
            .filter(|url| !url.is_empty())
            .cloned()
            .ok_or_else(|| BlobError::MissingMetadata {
                key: key.to_owned(),
                field: SOURCE_URL_METADATA.to_owned(),
            })?;
        Ok((object.body, source_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;

    fn stores() -> (Arc<MemoryObjectStore>, WatBlobStore) {
        let objects = Arc::new(MemoryObjectStore::with_base_url(
            "https://s3.amazonaws.com/wats",
        ));
        let blobs = WatBlobStore::new(Arc::clone(&objects) as Arc<dyn ObjectStore>);
        (objects, blobs)
    }

    #[tokio::test]
    async fn original_round_trip_keeps_source_url() {
        let (objects, blobs) = stores();
        let stored = blobs
            .put_original("abc.jpg", Bytes::from_static(b"img"), "http://x/a.jpg")
            .await
            .unwrap();
        assert_eq!(stored.key, "original/abc.jpg");
        assert_eq!(
            stored.public_url,
            "https://s3.amazonaws.com/wats/original/abc.jpg"
        );
        assert_eq!(objects.is_public("original/abc.jpg"), Some(true));

        let (body, source) = blobs.get_original("original/abc.jpg").await.unwrap();
        assert_eq!(body, Bytes::from_static(b"img"));
        assert_eq!(source, "http://x/a.jpg");
    }

    #[tokio::test]
    async fn watified_uses_basename_of_original() {
        let (objects, blobs) = stores();
        let url = blobs
            .put_watified("original/abc.jpg", Bytes::from_static(b"out"))
            .await
            .unwrap();
        assert_eq!(url, "https://s3.amazonaws.com/wats/watified/abc.jpg");
        assert!(objects.contains("watified/abc.jpg"));
        assert_eq!(objects.is_public("watified/abc.jpg"), Some(true));
    }

    #[tokio::test]
    async fn missing_metadata_is_reported() {
        let (objects, blobs) = stores();
        objects
            .put(PutObject::new(
                "original/bare.jpg",
                Bytes::from_static(b"img"),
                JPEG_CONTENT_TYPE,
            ))
            .await
            .unwrap();
        let err = blobs.get_original("original/bare.jpg").await.unwrap_err();
        assert!(matches!(err, BlobError::MissingMetadata { .. }));
    }

    #[tokio::test]
    async fn missing_original_is_not_found() {
        let (_, blobs) = stores();
        assert!(matches!(
            blobs.get_original("original/none.jpg").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn non_original_key_is_rejected() {
        let (_, blobs) = stores();
        assert!(matches!(
            blobs.get_original("watified/abc.jpg").await,
            Err(BlobError::InvalidKey(_))
        ));
    }
}
