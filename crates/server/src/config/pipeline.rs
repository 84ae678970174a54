use std::time::Duration;

use serde::Deserialize;

/// Stage settings.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Timeout for fetching a submitted image, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Path of the overlay image composited onto every original.
    #[serde(default = "default_overlay_path")]
    pub overlay_path: String,
    /// Number of records shown on the home page.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl PipelineConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_seconds: default_fetch_timeout(),
            overlay_path: default_overlay_path(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    5
}

fn default_overlay_path() -> String {
    "assets/watboy.png".to_owned()
}

fn default_recent_limit() -> usize {
    30
}
