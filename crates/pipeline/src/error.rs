use thiserror::Error;

use watify_blob::BlobError;
use watify_compositor::CompositeError;
use watify_core::{EventParseError, WatStatus};
use watify_state::StateError;

/// Errors fetching a source image.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// No response within the fetch timeout.
    #[error("fetch timed out")]
    Timeout,

    /// The host could not be reached or the connection failed.
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-success status.
    #[error("source answered HTTP {0}")]
    Status(u16),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Errors raised while processing one pipeline item.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching the source image failed.
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    /// A blob, its metadata or a record was missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record or blob store rejected an operation.
    #[error("store write failed: {0}")]
    StoreWrite(String),

    /// The image could not be decoded or the result could not be encoded.
    #[error("image error: {0}")]
    Decode(String),

    /// The submitted input was rejected before reaching any store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The record's status no longer allows the update.
    #[error("record moved on from {from}, cannot set {to}")]
    StaleTransition {
        /// Status found on the record.
        from: WatStatus,
        /// Status the stage tried to set.
        to: WatStatus,
    },

    /// A change notification could not be parsed.
    #[error("malformed notification: {0}")]
    Parse(#[from] EventParseError),

    /// The pipeline was assembled without a required component.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<StateError> for PipelineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(url) => Self::NotFound(format!("record {url}")),
            StateError::InvalidTransition { from, to } => Self::StaleTransition { from, to },
            other => Self::StoreWrite(other.to_string()),
        }
    }
}

impl From<BlobError> for PipelineError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) | BlobError::MissingMetadata { .. } => {
                Self::NotFound(err.to_string())
            }
            BlobError::InvalidKey(_) => Self::InvalidInput(err.to_string()),
            BlobError::Storage(_) | BlobError::Unavailable(_) => Self::StoreWrite(err.to_string()),
        }
    }
}

impl From<CompositeError> for PipelineError {
    fn from(err: CompositeError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_becomes_stale() {
        let err: PipelineError = StateError::InvalidTransition {
            from: WatStatus::Completed,
            to: WatStatus::Downloaded,
        }
        .into();
        assert!(matches!(
            err,
            PipelineError::StaleTransition {
                from: WatStatus::Completed,
                to: WatStatus::Downloaded
            }
        ));
    }

    #[test]
    fn missing_metadata_is_not_found() {
        let err: PipelineError = BlobError::MissingMetadata {
            key: "original/a.jpg".into(),
            field: "original_url".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::NotFound(msg) if msg.contains("original_url")));
    }

    #[test]
    fn backend_failures_are_store_writes() {
        let err: PipelineError = StateError::Backend("throttled".into()).into();
        assert!(matches!(err, PipelineError::StoreWrite(_)));
        let err: PipelineError = BlobError::Storage("denied".into()).into();
        assert!(matches!(err, PipelineError::StoreWrite(_)));
    }

    #[test]
    fn unavailable_blob_store_keeps_its_cause() {
        let err: PipelineError = BlobError::Unavailable("AWS request timed out".into()).into();
        assert!(matches!(
            err,
            PipelineError::StoreWrite(msg) if msg == "blob storage unavailable: AWS request timed out"
        ));
    }

    #[test]
    fn fetch_status_display() {
        let err: PipelineError = FetchError::Status(404).into();
        assert_eq!(err.to_string(), "network error: source answered HTTP 404");
    }
}
