//! Test doubles for the pipeline.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;
use crate::fetch::Fetcher;

/// A [`Fetcher`] serving canned responses by URL.
///
/// Unknown URLs fail as unreachable. Every request is recorded so tests can
/// assert which URLs were fetched.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, Result<Bytes, FetchError>>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.into(), Ok(body.into()));
        self
    }

    /// Fail requests for `url` with `error`.
    #[must_use]
    pub fn with_failure(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.responses.insert(url.into(), Err(error));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_owned());
        }
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Unreachable(format!("no route to {url}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_canned_responses() {
        let fetcher = StubFetcher::new()
            .with_response("http://x/a.jpg", Bytes::from_static(b"a"))
            .with_failure("http://x/slow.jpg", FetchError::Timeout);

        assert_eq!(
            fetcher.fetch("http://x/a.jpg").await.unwrap(),
            Bytes::from_static(b"a")
        );
        assert!(matches!(
            fetcher.fetch("http://x/slow.jpg").await,
            Err(FetchError::Timeout)
        ));
        assert!(matches!(
            fetcher.fetch("http://x/unknown.jpg").await,
            Err(FetchError::Unreachable(_))
        ));
        assert_eq!(fetcher.requests().len(), 3);
    }
}
