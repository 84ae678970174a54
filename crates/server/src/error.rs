use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use watify_pipeline::PipelineError;

/// Errors that can occur when running the Watify server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A page template failed to compile or render.
    #[error("template render error: {0}")]
    Render(String),

    /// An I/O error (binding the listener, reading input).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline error surfaced through the API.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Render(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Pipeline(err) => match err {
                PipelineError::InvalidInput(_) | PipelineError::Parse(_) => {
                    StatusCode::BAD_REQUEST
                }
                PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::StaleTransition { .. } => StatusCode::CONFLICT,
                PipelineError::Network(_) => StatusCode::BAD_GATEWAY,
                PipelineError::StoreWrite(_)
                | PipelineError::Decode(_)
                | PipelineError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use watify_core::EventParseError;

    use super::*;

    #[test]
    fn pipeline_errors_map_to_status_codes() {
        let cases = [
            (
                ServerError::from(PipelineError::InvalidInput("blank".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(PipelineError::Parse(EventParseError::MissingField(
                    "Records".into(),
                ))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(PipelineError::NotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(PipelineError::StoreWrite("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServerError::Config("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ServerError::Render("undefined value".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn response_carries_json_error() {
        let response =
            ServerError::from(PipelineError::InvalidInput("url must not be empty".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
