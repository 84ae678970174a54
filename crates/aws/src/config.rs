use serde::{Deserialize, Serialize};

/// Shared AWS settings for the S3 backend.
///
/// Region, optional STS assume-role ARN for cross-account buckets, and an
/// endpoint override for S3-compatible servers (e.g. `LocalStack`, `MinIO`).
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsBaseConfig {
    /// AWS region (e.g. `"us-east-1"`).
    #[serde(default = "default_region")]
    pub region: String,

    /// IAM role ARN to assume via STS.
    #[serde(default)]
    pub role_arn: Option<String>,

    /// Endpoint URL override.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// STS session name used with `role_arn` (defaults to `"watify"`).
    #[serde(default)]
    pub session_name: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

impl std::fmt::Debug for AwsBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsBaseConfig")
            .field("region", &self.region)
            .field("role_arn", &self.role_arn.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint_url", &self.endpoint_url)
            .field("session_name", &self.session_name)
            .finish()
    }
}

impl AwsBaseConfig {
    /// Settings for `region` with no role or endpoint override.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            role_arn: None,
            endpoint_url: None,
            session_name: None,
        }
    }

    /// Assume `role_arn` via STS.
    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }
}

impl Default for AwsBaseConfig {
    fn default() -> Self {
        Self::new(default_region())
    }
}

/// Default public URL prefix of S3 objects; the bucket name is appended.
pub const DEFAULT_S3_PUBLIC_HOST: &str = "https://s3.amazonaws.com";

/// Configuration for the S3 object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Shared AWS configuration (region, role ARN, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// Bucket holding both the `original/` and `watified/` namespaces.
    pub bucket: String,

    /// Base URL under which objects are publicly served.
    ///
    /// Defaults to `https://s3.amazonaws.com/<bucket>`.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Create a new `S3Config` for `bucket` in the given AWS region.
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            bucket: bucket.into(),
            public_base_url: None,
        }
    }

    /// Set the endpoint URL override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the public base URL.
    #[must_use]
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }

    /// Base URL objects are served under.
    pub fn public_base(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_owned(),
            None => format!("{DEFAULT_S3_PUBLIC_HOST}/{}", self.bucket),
        }
    }
}
