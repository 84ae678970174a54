use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The object exists but lacks a required metadata entry.
    #[error("object {key} has no {field} metadata")]
    MissingMetadata {
        /// Object key.
        key: String,
        /// Name of the missing metadata entry.
        field: String,
    },

    /// The object key is not valid for the requested operation.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),

    /// The backend could not be reached or asked the caller to back off.
    /// Retrying the same request later may succeed.
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}
