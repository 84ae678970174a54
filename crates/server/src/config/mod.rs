mod blob;
mod pipeline;
mod server;
mod state;
mod telemetry;


pub use blob::*;
pub use pipeline::*;
pub use server::*;
pub use state::*;
pub use telemetry::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Watify server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct WatifyConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Record store backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Blob store backend configuration.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Stage settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl WatifyConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ServerError> {
        toml::from_str(contents).map_err(|e| ServerError::Config(format!("invalid config: {e}")))
    }
}
