//! Backend selection from configuration.

use std::sync::Arc;

use tracing::info;

use watify_blob::{MemoryObjectStore, ObjectStore};
use watify_compositor::{Compositor, Overlay};
use watify_pipeline::Pipeline;
use watify_state::RecordStore;
use watify_state_memory::MemoryRecordStore;

#[cfg(feature = "s3")]
use watify_aws::{S3Config, S3ObjectStore};
#[cfg(feature = "dynamodb")]
use watify_state_dynamodb::{DynamoConfig, DynamoRecordStore};

use crate::config::{BlobConfig, StateConfig, WatifyConfig};
use crate::error::ServerError;

#[cfg(feature = "s3")]
const DEFAULT_REGION: &str = "us-east-1";

#[cfg(feature = "dynamodb")]
fn dynamo_config(config: &StateConfig) -> DynamoConfig {
    let defaults = DynamoConfig::default();
    DynamoConfig {
        table_name: config.table_name.clone().unwrap_or(defaults.table_name),
        region: config.region.clone().unwrap_or(defaults.region),
        endpoint_url: config.endpoint_url.clone(),
        index_name: config.index_name.clone().unwrap_or(defaults.index_name),
    }
}

/// Create the record store named by `[state] backend`.
#[allow(clippy::unused_async)]
pub async fn create_record_store(config: &StateConfig) -> Result<Arc<dyn RecordStore>, ServerError> {
    let store: Arc<dyn RecordStore> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryRecordStore::new()),
        #[cfg(feature = "dynamodb")]
        "dynamodb" => {
            let dynamo = dynamo_config(config);
            let store = DynamoRecordStore::new(&dynamo)
                .await
                .map_err(|e| ServerError::Config(format!("dynamodb record store: {e}")))?;
            Arc::new(store)
        }
        other => {
            return Err(ServerError::Config(format!(
                "unsupported state backend: {other}"
            )));
        }
    };
    info!(backend = %config.backend, "record store initialized");
    Ok(store)
}

/// Create the object store named by `[blob] backend`.
#[allow(clippy::unused_async)]
pub async fn create_object_store(config: &BlobConfig) -> Result<Arc<dyn ObjectStore>, ServerError> {
    let store: Arc<dyn ObjectStore> = match config.backend.as_str() {
        "memory" => match &config.public_base_url {
            Some(base) => Arc::new(MemoryObjectStore::with_base_url(base.clone())),
            None => Arc::new(MemoryObjectStore::new()),
        },
        #[cfg(feature = "s3")]
        "s3" => {
            let mut s3 = S3Config::new(
                config.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_owned()),
                config.bucket.clone(),
            );
            if let Some(endpoint) = &config.endpoint_url {
                s3 = s3.with_endpoint_url(endpoint.clone());
            }
            if let Some(base) = &config.public_base_url {
                s3 = s3.with_public_base_url(base.clone());
            }
            if let Some(role) = &config.role_arn {
                s3.aws = s3.aws.with_role_arn(role.clone());
            }
            Arc::new(S3ObjectStore::new(&s3).await)
        }
        other => {
            return Err(ServerError::Config(format!(
                "unsupported blob backend: {other}"
            )));
        }
    };
    info!(backend = %config.backend, bucket = %config.bucket, "object store initialized");
    Ok(store)
}

/// Check that a one-shot stage run sees the same stores as the rest of the
/// deployment.
///
/// Memory backends live and die with one process, so a batch handled against
/// them could never find the records it refers to.
pub fn ensure_shared_backends(config: &WatifyConfig) -> Result<(), ServerError> {
    if config.state.backend == "memory" || config.blob.backend == "memory" {
        return Err(ServerError::Config(
            "handle needs shared state and blob backends, memory backends only live inside a running server".into(),
        ));
    }
    Ok(())
}

/// Load the overlay image and wrap it in a compositor.
pub fn load_compositor(path: &str) -> Result<Compositor, ServerError> {
    let overlay = Overlay::from_path(path)
        .map_err(|e| ServerError::Config(format!("overlay {path}: {e}")))?;
    let (width, height) = overlay.dimensions();
    info!(path = %path, width, height, "overlay loaded");
    Ok(Compositor::new(overlay))
}

/// Assemble the full pipeline from configuration.
pub async fn build_pipeline(config: &WatifyConfig) -> Result<Pipeline, ServerError> {
    let store = create_record_store(&config.state).await?;
    let objects = create_object_store(&config.blob).await?;
    let compositor = load_compositor(&config.pipeline.overlay_path)?;

    Ok(Pipeline::builder()
        .store(store)
        .objects(objects)
        .compositor(compositor)
        .fetch_timeout(config.pipeline.fetch_timeout())
        .recent_limit(config.pipeline.recent_limit)
        .build()?)
}

/// Create the backing table of the configured record store.
#[allow(clippy::unused_async)]
pub async fn migrate(config: &StateConfig) -> Result<(), ServerError> {
    match config.backend.as_str() {
        "memory" => {
            info!("memory record store needs no migration");
            Ok(())
        }
        #[cfg(feature = "dynamodb")]
        "dynamodb" => {
            let dynamo = dynamo_config(config);
            let client = watify_state_dynamodb::build_client(&dynamo).await;
            watify_state_dynamodb::create_table(&client, &dynamo.table_name, &dynamo.index_name)
                .await
                .map_err(|e| ServerError::Config(format!("dynamodb migration: {e}")))?;
            info!(table = %dynamo.table_name, "table ready");
            Ok(())
        }
        other => Err(ServerError::Config(format!(
            "unsupported state backend: {other}"
        ))),
    }
}
