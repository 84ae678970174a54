use thiserror::Error;

/// Errors raised while parsing change-notification payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    /// A required field was absent. Carries the dotted path to the field.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field was present but had the wrong shape.
    #[error("invalid field {field}: expected {expected}")]
    InvalidField {
        /// Dotted path to the field.
        field: String,
        /// Description of the expected shape.
        expected: &'static str,
    },

    /// An entry did not match the expected notification shape.
    #[error("malformed entry: {0}")]
    Malformed(String),

    /// A `status` attribute held an unknown value.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// An event name outside the supported set.
    #[error("unsupported event name: {0}")]
    UnsupportedEvent(String),

    /// An object key could not be decoded.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}
