use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::cleanup::{BoxedCleanupStrategy, CustomCleanupStrategy, HybridCleanupStrategy};
use crate::auth::notify::{CustomNotifier, Notifier, NullNotifier};
use crate::auth::storage::{AuthStorage, MemoryStorage};
use crate::auth::{AuthConfig, AuthError, AuthServer};

/// A builder for creating an `AuthServer` instance.
///
/// This builder defaults to `MemoryStorage`, [`AuthConfig::default`], and
/// a notifier that drops every message, and allows for ergonomic
/// configuration of all server parameters.
#[must_use = "The builder does nothing unless `.build_and_init()` is called."]
pub struct AuthServerBuilder<S: AuthStorage> {
    storage: Arc<S>,
    config: Option<AuthConfig>,
    notifier: Option<Arc<dyn Notifier>>,
    cleanup_strategy: Option<BoxedCleanupStrategy>,
}

impl AuthServerBuilder<MemoryStorage> {
    /// Creates a new builder.
    ///
    /// By default, this builder uses `MemoryStorage`. Use `.with_storage()`
    /// to provide a different storage backend.
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            config: None,
            notifier: None,
            cleanup_strategy: None, // Will default to HybridCleanupStrategy in build_and_init
        }
    }
}

impl<S: AuthStorage + 'static> AuthServerBuilder<S> {
    /// Specifies a custom storage backend to use instead of the default
    /// `MemoryStorage`.
    pub fn with_storage<T: AuthStorage + 'static>(self, storage: Arc<T>) -> AuthServerBuilder<T> {
        AuthServerBuilder {
            storage,
            config: self.config,
            notifier: self.notifier,
            cleanup_strategy: self.cleanup_strategy,
        }
    }

    /// Sets the flow configuration (code TTL, cooldown, session TTL).
    ///
    /// If not set, [`AuthConfig::default`] is used.
    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the notifier that delivers passcodes to account holders.
    ///
    /// If not set, codes are silently dropped ([`NullNotifier`]).
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets a closure as the notifier.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use otp_auth::AuthServer;
    /// # async fn example() -> Result<(), otp_auth::AuthError> {
    /// let server = AuthServer::builder()
    ///     .with_notifier_fn(|recipient, purpose, _code| async move {
    ///         println!("would deliver a {purpose} code to {recipient}");
    ///         Ok(())
    ///     })
    ///     .build_and_init()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_notifier_fn<F, Fut>(mut self, send_fn: F) -> Self
    where
        F: Fn(String, crate::auth::record::Purpose, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AuthError>> + Send + 'static,
    {
        self.notifier = Some(Arc::new(CustomNotifier::new(send_fn)));
        self
    }

    /// Configures the automatic cleanup strategy with custom hybrid
    /// thresholds.
    ///
    /// By default, the server uses a hybrid cleanup strategy that triggers
    /// a sweep of expired records after 100 successful verifications or
    /// one minute, whichever comes first.
    pub fn with_hybrid_cleanup_thresholds(
        mut self,
        count_threshold: u32,
        time_threshold: Duration,
    ) -> Self {
        let strategy = HybridCleanupStrategy::new(count_threshold, time_threshold);
        self.cleanup_strategy = Some(Box::new(strategy));
        self
    }

    /// Configures a custom cleanup strategy using a user-provided closure.
    ///
    /// The closure is called after each successful code consumption to
    /// determine if a sweep should be triggered.
    pub fn with_custom_cleanup_strategy<F, Fut>(mut self, strategy_fn: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let strategy = CustomCleanupStrategy::new(strategy_fn);
        self.cleanup_strategy = Some(Box::new(strategy));
        self
    }

    /// Builds and initializes the `AuthServer`.
    ///
    /// This method consumes the builder and returns a fully configured and
    /// initialized server. It automatically calls the storage backend's
    /// `init()` method.
    pub async fn build_and_init(self) -> Result<AuthServer<S>, AuthError> {
        let config = self.config.unwrap_or_default();
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(NullNotifier));
        let cleanup_strategy = self
            .cleanup_strategy
            .unwrap_or_else(|| Box::new(HybridCleanupStrategy::default()));

        let server = AuthServer::new(self.storage, config, notifier, cleanup_strategy);
        server.init().await?;
        Ok(server)
    }
}
