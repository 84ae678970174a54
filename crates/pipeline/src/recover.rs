use tracing::warn;

use watify_core::WatStatus;
use watify_state::RecordStore;

/// Mark `url` as failed. Returns whether the `error` status was written.
///
/// A failed write is logged and swallowed; the record then keeps its last
/// status.
pub(crate) async fn record_error(store: &dyn RecordStore, url: &str) -> bool {
    match store.update_status(url, WatStatus::Error).await {
        Ok(()) => true,
        Err(err) => {
            warn!(url = %url, error = %err, "could not record error status");
            false
        }
    }
}
