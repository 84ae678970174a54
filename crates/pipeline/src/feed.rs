//! Batching of in-process change feeds.
//!
//! Backends without external change delivery publish their changes on a
//! broadcast channel. Each stage drains its channel into batches and handles
//! them the same way it handles a delivered notification.

use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

/// Largest batch handed to a stage at once.
pub const MAX_FEED_BATCH: usize = 25;

/// Wait for the next change, then take whatever else is already buffered, up
/// to `max` items.
///
/// Returns `None` once every sender is gone. Changes lost to lag are logged
/// and skipped.
pub async fn next_batch<T: Clone>(rx: &mut Receiver<T>, max: usize) -> Option<Vec<T>> {
    let first = loop {
        match rx.recv().await {
            Ok(item) => break item,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "change feed lagged, changes dropped");
            }
            Err(RecvError::Closed) => return None,
        }
    };

    let mut batch = vec![first];
    while batch.len() < max {
        match rx.try_recv() {
            Ok(item) => batch.push(item),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "change feed lagged, changes dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    Some(batch)
}
