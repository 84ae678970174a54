use thiserror::Error;
use watify_blob::BlobError;

/// Errors specific to AWS backend operations.
#[derive(Debug, Error)]
pub enum AwsError {
    /// The AWS SDK returned an error from the service.
    #[error("AWS service error: {0}")]
    ServiceError(String),

    /// The request was throttled by the AWS service.
    #[error("AWS request throttled")]
    Throttled,

    /// A network or connection error occurred communicating with AWS.
    #[error("AWS connection error: {0}")]
    Connection(String),

    /// The request timed out.
    #[error("AWS request timed out")]
    Timeout,
}

impl From<AwsError> for BlobError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Throttled | AwsError::Timeout | AwsError::Connection(_) => {
                BlobError::Unavailable(err.to_string())
            }
            AwsError::ServiceError(_) => BlobError::Storage(err.to_string()),
        }
    }
}

/// Classify an AWS SDK error string into the appropriate [`AwsError`].
///
/// Inspects the message for common patterns (throttling, timeout,
/// connection) and maps them to the matching variant.
pub fn classify_sdk_error(error_str: &str) -> AwsError {
    let lower = error_str.to_lowercase();
    if lower.contains("throttl") || lower.contains("slow down") || lower.contains("too many") {
        AwsError::Throttled
    } else if lower.contains("timeout") || lower.contains("timed out") {
        AwsError::Timeout
    } else if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("network")
    {
        AwsError::Connection(error_str.to_owned())
    } else {
        AwsError::ServiceError(error_str.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_throttled() {
        assert!(matches!(
            classify_sdk_error("SlowDown: Please reduce your request rate"),
            AwsError::Throttled
        ));
    }

    #[test]
    fn classify_timeout() {
        assert!(matches!(
            classify_sdk_error("Request timed out after 30s"),
            AwsError::Timeout
        ));
    }

    #[test]
    fn classify_connection() {
        assert!(matches!(
            classify_sdk_error("Connection refused: localhost:4566"),
            AwsError::Connection(_)
        ));
    }

    #[test]
    fn classify_generic_service_error() {
        assert!(matches!(
            classify_sdk_error("AccessDenied: Access Denied"),
            AwsError::ServiceError(_)
        ));
    }

    #[test]
    fn transient_errors_are_unavailable() {
        let err: BlobError = AwsError::Throttled.into();
        assert!(matches!(err, BlobError::Unavailable(msg) if msg == "AWS request throttled"));
        let err: BlobError = classify_sdk_error("Request timed out after 30s").into();
        assert!(matches!(err, BlobError::Unavailable(_)));
        let err: BlobError = classify_sdk_error("Connection refused: localhost:4566").into();
        assert!(matches!(err, BlobError::Unavailable(msg) if msg.contains("4566")));
    }

    #[test]
    fn service_errors_are_storage_errors() {
        let err: BlobError = classify_sdk_error("AccessDenied: Access Denied").into();
        assert!(matches!(err, BlobError::Storage(msg) if msg.contains("AccessDenied")));
    }
}
