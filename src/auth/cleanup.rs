//! Strategies for sweeping expired passcodes and sessions.
//!
//! Expired records are inert — matching already excludes them — so
//! sweeping is purely housekeeping and runs opportunistically in the
//! background after successful verifications.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// Strategy for determining when to perform automatic record cleanup.
///
/// Cleanup strategies are consulted by the server after each successful
/// code consumption to check if it's time to sweep expired passcodes and
/// sessions from storage.
#[async_trait]
pub trait CleanupStrategy: Send + Sync {
    /// Determines whether cleanup should be triggered.
    async fn should_cleanup(&self) -> bool;

    /// Marks that cleanup has been performed and resets internal state.
    async fn mark_as_cleaned(&self);
}

/// Default hybrid cleanup strategy that triggers cleanup based on both
/// operation count and elapsed time since the last cleanup.
pub struct HybridCleanupStrategy {
    count_threshold: u32,
    time_threshold: Duration,
    op_count: AtomicU32,
    last_cleanup_time: AtomicU64,
}

impl HybridCleanupStrategy {
    /// Creates a new hybrid cleanup strategy with the specified thresholds.
    ///
    /// # Arguments
    ///
    /// * `count_threshold` - Number of successful verifications before triggering cleanup
    /// * `time_threshold` - Maximum duration between cleanup operations
    pub fn new(count_threshold: u32, time_threshold: Duration) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            count_threshold,
            time_threshold,
            op_count: AtomicU32::new(0),
            last_cleanup_time: AtomicU64::new(now),
        }
    }
}

#[async_trait]
impl CleanupStrategy for HybridCleanupStrategy {
    async fn should_cleanup(&self) -> bool {
        let count = self.op_count.fetch_add(1, Ordering::SeqCst) + 1;

        if count >= self.count_threshold {
            return true;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let last_cleanup = self.last_cleanup_time.load(Ordering::SeqCst);
        let elapsed = now.saturating_sub(last_cleanup);

        elapsed >= self.time_threshold.as_secs()
    }

    async fn mark_as_cleaned(&self) {
        self.op_count.store(0, Ordering::SeqCst);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_cleanup_time.store(now, Ordering::SeqCst);
    }
}

impl Default for HybridCleanupStrategy {
    /// Creates a new hybrid cleanup strategy with default thresholds.
    ///
    /// Uses a count threshold of 100 verifications and a time threshold
    /// of 1 minute.
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

/// Wrapper for custom cleanup strategies provided via closures.
pub struct CustomCleanupStrategy<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    strategy_fn: F,
}

impl<F, Fut> CustomCleanupStrategy<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    /// Creates a new custom cleanup strategy from a closure.
    pub fn new(strategy_fn: F) -> Self {
        Self { strategy_fn }
    }
}

#[async_trait]
impl<F, Fut> CleanupStrategy for CustomCleanupStrategy<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn should_cleanup(&self) -> bool {
        (self.strategy_fn)().await
    }

    async fn mark_as_cleaned(&self) {
        // State management is left to the closure
    }
}

/// Type alias for boxed cleanup strategies to reduce verbosity.
pub type BoxedCleanupStrategy = Box<dyn CleanupStrategy>;
