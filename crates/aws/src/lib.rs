//! AWS backends for Watify.
//!
//! Provides [`S3ObjectStore`], an S3 implementation of the
//! [`ObjectStore`](watify_blob::ObjectStore) trait. AWS settings are shared
//! through [`AwsBaseConfig`](config::AwsBaseConfig): region, endpoint override
//! for S3-compatible servers, and optional STS assume-role credentials.

pub mod auth;
pub mod config;
pub mod error;
pub mod s3;

pub use config::{AwsBaseConfig, S3Config};
pub use error::AwsError;
pub use s3::S3ObjectStore;
