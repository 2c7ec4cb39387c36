use std::sync::Arc;
use std::time::Duration;

use super::cleanup::BoxedCleanupStrategy;
use super::code::CodeStore;
use super::notify::{self, Notifier};
use super::session::SessionManager;
use super::visits::VisitCounter;
use super::{AuthConfig, AuthError, AuthServerBuilder, AuthStorage, password, time_utils};
use crate::auth::record::{Identity, Profile, Purpose, VerificationStatus, Verified, VisitOutcome};
use crate::auth::storage::{MemoryStorage, StorageStats};

/// The account-verification service: registration, passcode verification,
/// password reset, sessions, and visit counting over one storage backend.
///
/// This is the surface a presentation layer calls into; it owns no
/// transport. Expired records are swept opportunistically in the
/// background based on a configurable strategy.
///
/// To create an instance, use the `AuthServer::builder()` method.
pub struct AuthServer<S: AuthStorage> {
    pub(crate) storage: Arc<S>,
    pub(crate) codes: CodeStore<S>,
    pub(crate) sessions: SessionManager<S>,
    pub(crate) visits: VisitCounter<S>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) notify_timeout: Duration,
    pub(crate) cleanup_strategy: BoxedCleanupStrategy,
}

impl AuthServer<MemoryStorage> {
    /// Creates a new `AuthServerBuilder` to construct an `AuthServer`.
    ///
    /// The builder defaults to `MemoryStorage`, the default configuration,
    /// and a notifier that drops every message. Provide real ones with the
    /// builder's `with_*` methods.
    pub fn builder() -> AuthServerBuilder<MemoryStorage> {
        AuthServerBuilder::new()
    }
}

impl<S: AuthStorage + 'static> AuthServer<S> {
    /// Internal constructor used by the builder.
    pub(crate) fn new(
        storage: Arc<S>,
        config: AuthConfig,
        notifier: Arc<dyn Notifier>,
        cleanup_strategy: BoxedCleanupStrategy,
    ) -> Self {
        Self {
            codes: CodeStore::new(
                Arc::clone(&storage),
                config.code_ttl,
                config.resend_cooldown,
            ),
            sessions: SessionManager::new(Arc::clone(&storage), config.session_ttl),
            visits: VisitCounter::new(Arc::clone(&storage)),
            storage,
            notifier,
            notify_timeout: config.notify_timeout,
            cleanup_strategy,
        }
    }

    /// Initializes the storage backend (e.g., creates database tables).
    pub(crate) async fn init(&self) -> Result<(), AuthError> {
        self.storage.init().await
    }

    /// Registers a new account and dispatches a signup code.
    ///
    /// The email is lowercased before storage and uniqueness checking;
    /// a duplicate registration fails with [`AuthError::Conflict`]. The
    /// new identity starts in `PendingVerification` and cannot log in
    /// until [`verify_signup`](Self::verify_signup) succeeds. Code
    /// delivery is best-effort and never fails the registration.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: Profile,
    ) -> Result<Identity, AuthError> {
        let email = email.trim().to_lowercase();
        let now = time_utils::current_timestamp()?;
        let identity = Identity::new(email, password::hash(password)?, profile, now);

        self.storage.insert_identity(identity.clone()).await?;

        let record = self.codes.issue(&identity.id, Purpose::Signup).await?;
        notify::dispatch(
            Arc::clone(&self.notifier),
            self.notify_timeout,
            identity.email.clone(),
            Purpose::Signup,
            record.code,
        );

        Ok(identity)
    }

    /// Verifies a signup code and activates the account.
    ///
    /// On success the identity becomes `Active` and a fresh session is
    /// returned. On any code error the identity stays in
    /// `PendingVerification` and the specific error is surfaced.
    pub async fn verify_signup(&self, identity_id: &str, code: &str) -> Result<Verified, AuthError> {
        let mut identity = self
            .storage
            .identity_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        self.codes
            .consume(identity_id, Purpose::Signup, code)
            .await?;

        self.storage
            .set_status(identity_id, VerificationStatus::Active)
            .await?;
        identity.status = VerificationStatus::Active;

        let session = self.sessions.issue(identity_id).await?;
        self.maybe_trigger_cleanup().await;

        Ok(Verified { session, identity })
    }

    /// Reissues the current code for an identity and purpose.
    ///
    /// Gated by the resend cooldown ([`AuthError::TooSoon`] inside the
    /// window); on success the previous code is superseded and the new one
    /// dispatched.
    pub async fn resend_code(&self, identity_id: &str, purpose: Purpose) -> Result<(), AuthError> {
        let identity = self
            .storage
            .identity_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let record = self.codes.reissue(identity_id, purpose).await?;
        notify::dispatch(
            Arc::clone(&self.notifier),
            self.notify_timeout,
            identity.email,
            purpose,
            record.code,
        );

        Ok(())
    }

    /// Whether a resend for the identity and purpose is currently outside
    /// the cooldown window. Advisory; [`resend_code`](Self::resend_code)
    /// re-checks atomically.
    pub async fn can_resend(&self, identity_id: &str, purpose: Purpose) -> Result<bool, AuthError> {
        self.codes.can_reissue(identity_id, purpose).await
    }

    /// Starts a password reset for the account behind an email address.
    ///
    /// Returns the identity id on success and [`AuthError::NotFound`] for
    /// an unknown email — whether that distinction reaches end users is
    /// the caller's disclosure decision. The identity's status is not
    /// changed; holding an unconsumed reset code is what makes it
    /// reset-eligible.
    pub async fn request_password_reset(&self, email: &str) -> Result<String, AuthError> {
        let email = email.trim().to_lowercase();
        let identity = self
            .storage
            .identity_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let record = self
            .codes
            .issue(&identity.id, Purpose::PasswordReset)
            .await?;
        notify::dispatch(
            Arc::clone(&self.notifier),
            self.notify_timeout,
            identity.email,
            Purpose::PasswordReset,
            record.code,
        );

        Ok(identity.id)
    }

    /// Completes a password reset.
    ///
    /// Consumes the reset code and replaces the credential hash. No
    /// session is issued; the account holder logs in explicitly with the
    /// new password.
    pub async fn reset_password(
        &self,
        identity_id: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.storage
            .identity_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        self.codes
            .consume(identity_id, Purpose::PasswordReset, code)
            .await?;

        self.storage
            .set_credential_hash(identity_id, &password::hash(new_password)?)
            .await?;
        self.maybe_trigger_cleanup().await;

        Ok(())
    }

    /// Email/password login. See [`SessionManager::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Verified, AuthError> {
        let (session, identity) = self.sessions.login(email, password).await?;
        Ok(Verified { session, identity })
    }

    /// Resolves a bearer token to its identity id, the gate in front of
    /// every protected operation. See [`SessionManager::validate`].
    pub async fn validate(&self, token: &str) -> Result<String, AuthError> {
        self.sessions.validate(token).await
    }

    /// Invalidates a session. Idempotent.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.logout(token).await
    }

    /// Records a visit for a browser-session marker.
    ///
    /// Idempotent per marker, including under concurrent duplicate calls.
    pub async fn record_visit(&self, marker: &str) -> Result<VisitOutcome, AuthError> {
        self.visits.record(marker).await
    }

    /// Current aggregate of distinct visits.
    pub async fn visit_total(&self) -> Result<u64, AuthError> {
        self.visits.total().await
    }

    /// Returns statistics about the storage backend.
    pub async fn stats(&self) -> Result<StorageStats, AuthError> {
        self.storage.get_stats().await
    }

    /// Sweeps expired passcodes and sessions from the storage backend.
    pub async fn cleanup_expired_records(&self) -> Result<usize, AuthError> {
        let now = time_utils::current_timestamp()?;
        self.storage.cleanup_expired(now).await
    }

    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Check cleanup strategy and trigger background cleanup if needed.
    async fn maybe_trigger_cleanup(&self) {
        if self.cleanup_strategy.should_cleanup().await {
            self.spawn_background_cleanup();
            self.cleanup_strategy.mark_as_cleaned().await;
        }
    }

    /// Spawn background cleanup task.
    fn spawn_background_cleanup(&self) {
        let storage = Arc::clone(&self.storage);

        tokio::spawn(async move {
            let result = match time_utils::current_timestamp() {
                Ok(now) => storage.cleanup_expired(now).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!("Background cleanup failed: {e}");
            }
        });
    }
}
