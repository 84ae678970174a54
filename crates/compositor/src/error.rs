use thiserror::Error;

/// Errors produced while compositing.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// The original image could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The composited image could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),

    /// The overlay asset could not be loaded.
    #[error("invalid overlay: {0}")]
    Overlay(String),
}
