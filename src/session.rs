//! Per-conversation session state
//!
//! One `SessionRecord` per session id, held in a process-local store.
//! Incoming slot values pass through the normalizer before they are merged
//! into a record's collected fields.

mod fields;
mod normalize;
mod store;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use fields::{CollectedFields, NamedEntity, Parameters, Slot};
#[allow(unused_imports)]
pub use normalize::{normalize, RAW_TRANSCRIPT_SUFFIX};
#[allow(unused_imports)]
pub use store::{Counter, SessionRecord, SessionStore, StoreError};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Start the background task that drops sessions idle for longer than `ttl`.
///
/// Runs until the runtime shuts down.
pub fn spawn_sweeper(store: Arc<SessionStore>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(chrono::Utc::now(), ttl);
            if evicted > 0 {
                tracing::info!(
                    evicted,
                    remaining = store.len(),
                    ttl_secs = ttl.as_secs(),
                    "Evicted idle sessions"
                );
            } else {
                tracing::debug!(remaining = store.len(), "Session sweep found nothing idle");
            }
        }
    })
}
