pub mod events;
pub mod health;
pub mod home;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use minijinja::Environment;
use watify_pipeline::Pipeline;

use crate::error::ServerError;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The assembled pipeline stages.
    pub pipeline: Pipeline,
    /// Compiled page templates.
    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    /// Wrap `pipeline`, compiling the page templates.
    pub fn new(pipeline: Pipeline) -> Result<Self, ServerError> {
        Ok(Self {
            pipeline,
            templates: Arc::new(home::templates()?),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index).post(home::create))
        .route("/v1/events/records", post(events::records))
        .route("/v1/events/objects", post(events::objects))
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
