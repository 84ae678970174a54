use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tracing::{debug, error, instrument};

use watify_blob::{BlobError, ObjectStore, PutObject, StoredObject, join_public_url};

use crate::auth::build_sdk_config;
use crate::config::S3Config;
use crate::error::classify_sdk_error;

/// S3-backed [`ObjectStore`].
///
/// All objects live in one bucket. Public-read objects are written with the
/// `public-read` canned ACL and served under the configured public base URL.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket)
            .field("public_base", &self.public_base)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3ObjectStore {
    /// Create a new `S3ObjectStore` by building an AWS SDK client.
    ///
    /// Path-style addressing is forced when an endpoint override is set so
    /// that S3-compatible servers resolve the bucket.
    pub async fn new(config: &S3Config) -> Self {
        let sdk_config = build_sdk_config(&config.aws).await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.aws.endpoint_url.is_some())
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);
        Self::with_client(config, client)
    }

    /// Create an `S3ObjectStore` with a pre-built client.
    pub fn with_client(config: &S3Config, client: aws_sdk_s3::Client) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            public_base: config.public_base(),
        }
    }

    /// Bucket this store writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, object), fields(bucket = %self.bucket, key = %object.key))]
    async fn put(&self, object: PutObject) -> Result<(), BlobError> {
        debug!(size = object.body.len(), "uploading object to S3");

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .content_type(&object.content_type)
            .body(ByteStream::from(object.body))
            .set_metadata(Some(object.metadata));
        if object.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request.send().await.map_err(|e| {
            let err_str = e.to_string();
            error!(error = %err_str, "S3 put_object failed");
            BlobError::from(classify_sdk_error(&err_str))
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<StoredObject, BlobError> {
        let result = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(result) => result,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(aws_sdk_s3::operation::get_object::GetObjectError::is_no_such_key)
                {
                    return Err(BlobError::NotFound(key.to_owned()));
                }
                let err_str = err.to_string();
                error!(error = %err_str, "S3 get_object failed");
                return Err(classify_sdk_error(&err_str).into());
            }
        };

        let content_type = result.content_type().map(str::to_owned);
        let metadata: HashMap<String, String> = result.metadata().cloned().unwrap_or_default();
        let body = result
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Storage(format!("failed to read S3 body: {e}")))?
            .into_bytes();

        debug!(size = body.len(), "S3 object downloaded");
        Ok(StoredObject {
            key: key.to_owned(),
            body,
            content_type,
            metadata,
        })
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(&self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> aws_sdk_s3::Client {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        aws_sdk_s3::Client::from_conf(conf)
    }

    #[test]
    fn public_url_defaults_to_s3_path_style() {
        let store = S3ObjectStore::with_client(&S3Config::new("us-east-1", "wats"), offline_client());
        assert_eq!(store.bucket(), "wats");
        assert_eq!(
            store.public_url("original/abc.jpg"),
            "https://s3.amazonaws.com/wats/original/abc.jpg"
        );
    }

    #[test]
    fn public_url_honours_custom_base() {
        let config =
            S3Config::new("us-east-1", "wats").with_public_base_url("https://cdn.example.com");
        let store = S3ObjectStore::with_client(&config, offline_client());
        assert_eq!(
            store.public_url("watified/abc.jpg"),
            "https://cdn.example.com/watified/abc.jpg"
        );
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use bytes::Bytes;

    use super::*;

    fn test_config() -> S3Config {
        S3Config::new(
            "us-east-1",
            std::env::var("S3_BUCKET").unwrap_or_else(|_| "watify-test".to_owned()),
        )
        .with_endpoint_url(
            std::env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://localhost:4566".to_owned()),
        )
    }

    #[tokio::test]
    async fn put_then_get_keeps_metadata() {
        let store = S3ObjectStore::new(&test_config()).await;
        store
            .put(
                PutObject::new("original/it.jpg", Bytes::from_static(b"img"), "image/jpeg")
                    .with_metadata("original_url", "http://x/it.jpg"),
            )
            .await
            .expect("put should succeed");

        let object = store.get("original/it.jpg").await.expect("get should succeed");
        assert_eq!(object.body, Bytes::from_static(b"img"));
        assert_eq!(
            object.metadata.get("original_url").map(String::as_str),
            Some("http://x/it.jpg")
        );
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = S3ObjectStore::new(&test_config()).await;
        let result = store.get("original/definitely-missing.jpg").await;
        assert!(matches!(result, Err(BlobError::NotFound(_))));
    }
}
