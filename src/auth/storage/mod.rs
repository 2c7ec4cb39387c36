//! Pluggable storage backends for identity, passcode, session, and
//! visit-marker persistence.
//!
//! This module provides a trait-based storage system that allows different
//! backends to be used for persistence. The in-memory backend is always
//! available; the SQLite backend is enabled with the `sqlite-storage`
//! feature.

use crate::auth::error::AuthError;
use crate::auth::record::{Identity, OtpRecord, Purpose, Session, VerificationStatus, VisitOutcome};
use async_trait::async_trait;
use std::time::Duration;

// Always available
mod memory;
pub use memory::MemoryStorage;

// Feature-gated storage backends
#[cfg(feature = "sqlite-storage")]
mod sqlite;
#[cfg(feature = "sqlite-storage")]
pub use sqlite::SqliteStorage;

/// Statistics about a storage backend.
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Number of identities on record.
    pub identities: usize,
    /// Number of passcode records currently held (including consumed and
    /// expired records that have not been swept yet).
    pub codes: usize,
    /// Number of live session records.
    pub sessions: usize,
    /// Total distinct visit markers observed.
    pub visit_total: u64,
    /// Additional backend-specific information.
    pub backend_info: String,
}

/// Abstract storage backend for the verification flows.
///
/// The contract pushes every race-sensitive decision into the backend so
/// that a single lock acquisition or transaction covers it:
///
/// - [`store_code`](AuthStorage::store_code) applies the resend cooldown
///   and replaces the previous record for the (identity, purpose) pair in
///   one step, so two racing reissues cannot both win.
/// - [`consume_code`](AuthStorage::consume_code) runs the entire
///   match-and-mark sequence atomically, so a code is consumed exactly
///   once even under concurrent attempts.
/// - [`record_visit`](AuthStorage::record_visit) is a check-and-set on the
///   marker, so N concurrent calls with one marker count once.
///
/// # Thread Safety
///
/// All methods are async and must be thread-safe. Implementations should
/// handle concurrent access properly.
///
/// # Error Handling
///
/// All methods return `Result<T, AuthError>` and should map backend-specific
/// errors to appropriate `AuthError` variants.
#[async_trait]
pub trait AuthStorage: Send + Sync {
    /// Optional method for storage backend initialization.
    ///
    /// Called once when the backend is first used. Implementations can use
    /// this for tasks like schema creation or connection setup.
    async fn init(&self) -> Result<(), AuthError> {
        // Default implementation does nothing
        Ok(())
    }

    /// Inserts a new identity.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the identity was stored
    /// * `Err(AuthError::Conflict)` - If an identity with the same email
    ///   already exists (emails are expected pre-lowercased)
    async fn insert_identity(&self, identity: Identity) -> Result<(), AuthError>;

    /// Looks up an identity by id.
    async fn identity_by_id(&self, id: &str) -> Result<Option<Identity>, AuthError>;

    /// Looks up an identity by (lowercased) email.
    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;

    /// Updates the verification status of an identity.
    ///
    /// Returns `AuthError::NotFound` if the identity does not exist.
    async fn set_status(&self, id: &str, status: VerificationStatus) -> Result<(), AuthError>;

    /// Replaces the credential hash of an identity.
    ///
    /// Returns `AuthError::NotFound` if the identity does not exist.
    async fn set_credential_hash(&self, id: &str, credential_hash: &str) -> Result<(), AuthError>;

    /// Stores a passcode record, superseding any prior record for the same
    /// (identity, purpose) pair.
    ///
    /// When `cooldown` is given and the existing record for the pair was
    /// issued less than `cooldown` before the new record, the call fails
    /// with `AuthError::TooSoon` and the existing record stays in place.
    /// The check and the replacement are one atomic step.
    async fn store_code(
        &self,
        record: OtpRecord,
        cooldown: Option<Duration>,
    ) -> Result<(), AuthError>;

    /// Retrieves the current passcode record for a (identity, purpose)
    /// pair, consumed or not.
    async fn code_for(
        &self,
        identity_id: &str,
        purpose: Purpose,
    ) -> Result<Option<OtpRecord>, AuthError>;

    /// Atomically matches and consumes a passcode.
    ///
    /// The checks run in a fixed order against the single record for the
    /// (identity, purpose) pair:
    ///
    /// 1. no record → `AuthError::NotFound`
    /// 2. past expiry → `AuthError::Expired`
    /// 3. already consumed → `AuthError::AlreadyConsumed`
    /// 4. code mismatch → `AuthError::Mismatch`
    /// 5. otherwise the record is marked consumed and the call succeeds
    ///
    /// Concurrent calls are linearized per pair: at most one succeeds.
    async fn consume_code(
        &self,
        identity_id: &str,
        purpose: Purpose,
        supplied: &str,
        now: i64,
    ) -> Result<(), AuthError>;

    /// Stores a new session keyed by its token.
    async fn insert_session(&self, session: Session) -> Result<(), AuthError>;

    /// Looks up a session by token.
    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, AuthError>;

    /// Removes a session. Removing an absent session is not an error.
    async fn remove_session(&self, token: &str) -> Result<(), AuthError>;

    /// Check-and-set registration of a visit marker.
    ///
    /// The first call with a given marker registers it and increments the
    /// aggregate; every later call (including concurrent duplicates) sees
    /// `counted: false`. Both outcomes report the current total.
    async fn record_visit(&self, marker: &str) -> Result<VisitOutcome, AuthError>;

    /// Returns the total number of distinct markers observed.
    async fn visit_total(&self) -> Result<u64, AuthError>;

    /// Removes expired passcode records and expired sessions.
    ///
    /// # Returns
    ///
    /// * `Ok(count)` - Number of records that were removed
    async fn cleanup_expired(&self, now: i64) -> Result<usize, AuthError>;

    /// Returns statistics about the storage backend.
    async fn get_stats(&self) -> Result<StorageStats, AuthError>;
}
