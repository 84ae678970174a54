use serde::Deserialize;

/// Configuration for the blob store holding originals and watified images.
///
/// # Example
///
/// ```toml
/// [blob]
/// backend = "s3"
/// bucket = "wats"
/// region = "us-east-1"
/// ```
#[derive(Debug, Deserialize)]
pub struct BlobConfig {
    /// Which backend to use: `"memory"` or `"s3"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// AWS region for the S3 backend.
    pub region: Option<String>,

    /// Endpoint override for S3-compatible servers.
    pub endpoint_url: Option<String>,

    /// Base URL public object URLs are built from. Defaults to the
    /// bucket's path-style S3 URL, or `memory://blobs` for the memory
    /// backend.
    pub public_base_url: Option<String>,

    /// IAM role to assume before talking to S3.
    pub role_arn: Option<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: default_bucket(),
            region: None,
            endpoint_url: None,
            public_base_url: None,
            role_arn: None,
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_bucket() -> String {
    "wats".to_owned()
}
