//! Visit counting deduplicated by browser-session marker.

use std::sync::Arc;

use crate::auth::error::AuthError;
use crate::auth::record::VisitOutcome;
use crate::auth::storage::AuthStorage;

/// Counts distinct browser sessions.
///
/// Each browser session presents a client-generated marker (see
/// [`crate::client::BrowserSession`]); the first sighting of a marker
/// increments the aggregate and every replay is a no-op, including
/// concurrent replays — deduplication rides on the storage backend's
/// check-and-set. A closed-and-reopened browser produces a new marker and
/// a new count; this is a coarse visit metric, not an anti-fraud device.
pub struct VisitCounter<S> {
    storage: Arc<S>,
}

impl<S: AuthStorage> VisitCounter<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Records a visit for the given marker.
    pub async fn record(&self, marker: &str) -> Result<VisitOutcome, AuthError> {
        self.storage.record_visit(marker).await
    }

    /// Current aggregate of distinct markers.
    pub async fn total(&self) -> Result<u64, AuthError> {
        self.storage.visit_total().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;

    #[tokio::test]
    async fn test_replay_does_not_double_count() -> Result<(), AuthError> {
        let counter = VisitCounter::new(Arc::new(MemoryStorage::new()));

        assert!(counter.record("m-1").await?.counted);
        assert!(!counter.record("m-1").await?.counted);
        assert!(counter.record("m-2").await?.counted);
        assert_eq!(counter.total().await?, 2);
        Ok(())
    }
}
