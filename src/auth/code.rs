//! One-time passcode issuance and consumption.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::rngs::OsRng;

use crate::auth::error::AuthError;
use crate::auth::record::{OtpRecord, Purpose};
use crate::auth::storage::AuthStorage;
use crate::auth::time_utils;

/// Width of generated passcodes, in decimal digits.
pub const CODE_DIGITS: usize = 6;

/// Issues and consumes one-time passcodes against a storage backend.
///
/// Codes are six decimal digits drawn from the operating system's
/// cryptographically secure random source, zero-padded, and valid for the
/// configured TTL. Exactly one record exists per (identity, purpose) pair;
/// issuing replaces the previous record, so an older code stops matching
/// the moment a newer one exists.
pub struct CodeStore<S> {
    storage: Arc<S>,
    ttl: Duration,
    cooldown: Duration,
}

impl<S: AuthStorage> CodeStore<S> {
    /// Creates a code store with the given validity window and resend
    /// cooldown.
    pub fn new(storage: Arc<S>, ttl: Duration, cooldown: Duration) -> Self {
        Self {
            storage,
            ttl,
            cooldown,
        }
    }

    /// Issues a fresh code, unconditionally superseding any prior record
    /// for the same (identity, purpose) pair.
    pub async fn issue(&self, identity_id: &str, purpose: Purpose) -> Result<OtpRecord, AuthError> {
        let record = self.fresh_record(identity_id, purpose)?;
        self.storage.store_code(record.clone(), None).await?;
        Ok(record)
    }

    /// Issues a fresh code, but only if the resend cooldown for the pair
    /// has elapsed.
    ///
    /// The cooldown check and the replacement are one atomic storage
    /// operation: of two racing reissues, exactly one wins and the other
    /// sees [`AuthError::TooSoon`].
    pub async fn reissue(
        &self,
        identity_id: &str,
        purpose: Purpose,
    ) -> Result<OtpRecord, AuthError> {
        let record = self.fresh_record(identity_id, purpose)?;
        self.storage
            .store_code(record.clone(), Some(self.cooldown))
            .await?;
        Ok(record)
    }

    /// Whether a reissue for the pair would currently be allowed.
    ///
    /// Advisory only — [`reissue`](Self::reissue) re-checks atomically,
    /// so a `true` here can still lose a race and end in
    /// [`AuthError::TooSoon`].
    pub async fn can_reissue(
        &self,
        identity_id: &str,
        purpose: Purpose,
    ) -> Result<bool, AuthError> {
        let now = time_utils::current_timestamp()?;
        Ok(match self.storage.code_for(identity_id, purpose).await? {
            Some(existing) => now - existing.issued_at >= self.cooldown.as_secs() as i64,
            None => true,
        })
    }

    /// Consumes a submitted code.
    ///
    /// Succeeds at most once per issued code; see
    /// [`AuthStorage::consume_code`] for the error ordering.
    pub async fn consume(
        &self,
        identity_id: &str,
        purpose: Purpose,
        supplied: &str,
    ) -> Result<(), AuthError> {
        let now = time_utils::current_timestamp()?;
        self.storage
            .consume_code(identity_id, purpose, supplied, now)
            .await
    }

    fn fresh_record(&self, identity_id: &str, purpose: Purpose) -> Result<OtpRecord, AuthError> {
        let now = time_utils::current_timestamp()?;
        Ok(OtpRecord::new(
            identity_id.to_string(),
            purpose,
            generate_code(),
            now,
            now + self.ttl.as_secs() as i64,
        ))
    }
}

/// Generates a zero-padded numeric passcode from the OS random source.
///
/// The code is the sole secret protecting the flow, so a predictable
/// source is not an option here.
pub(crate) fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", n, width = CODE_DIGITS)
}
