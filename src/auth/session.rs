//! Bearer-token session issuance and validation.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::auth::error::AuthError;
use crate::auth::password;
use crate::auth::record::{Identity, Session, VerificationStatus};
use crate::auth::storage::AuthStorage;
use crate::auth::time_utils;

/// Number of random bytes behind a session token (hex-doubled on the wire).
const TOKEN_BYTES: usize = 32;

/// Issues, validates, and revokes bearer sessions.
///
/// The manager is the sole authority on token validity: callers hold the
/// token opaquely and must discard it whenever validation rejects it (see
/// [`crate::client::authorized`] for the client-side half of that
/// contract).
pub struct SessionManager<S> {
    storage: Arc<S>,
    session_ttl: Option<Duration>,
}

impl<S: AuthStorage> SessionManager<S> {
    /// Creates a session manager; `session_ttl: None` means sessions
    /// never expire on their own.
    pub fn new(storage: Arc<S>, session_ttl: Option<Duration>) -> Self {
        Self {
            storage,
            session_ttl,
        }
    }

    /// Issues a new session for an identity.
    ///
    /// The token is drawn from the OS random source and returned exactly
    /// once, here; it appears in no listing or log afterwards.
    pub async fn issue(&self, identity_id: &str) -> Result<Session, AuthError> {
        let now = time_utils::current_timestamp()?;
        let session = Session {
            token: generate_token(),
            identity_id: identity_id.to_string(),
            issued_at: now,
            expires_at: self.session_ttl.map(|ttl| now + ttl.as_secs() as i64),
        };
        self.storage.insert_session(session.clone()).await?;
        Ok(session)
    }

    /// Email/password login for an active identity.
    ///
    /// Unknown email, wrong password, and an identity that has not
    /// finished verification all collapse into
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> Result<(Session, Identity), AuthError> {
        let email = email.trim().to_lowercase();
        let identity = self
            .storage
            .identity_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if identity.status != VerificationStatus::Active {
            return Err(AuthError::InvalidCredentials);
        }
        if !password::verify(password, &identity.credential_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue(&identity.id).await?;
        Ok((session, identity))
    }

    /// Resolves a token to its identity id.
    ///
    /// An expired session is removed on observation and reported as
    /// [`AuthError::Unauthorized`], the same as an unknown token.
    pub async fn validate(&self, token: &str) -> Result<String, AuthError> {
        let session = self
            .storage
            .session_by_token(token)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let now = time_utils::current_timestamp()?;
        if session.is_expired(now) {
            self.storage.remove_session(token).await?;
            return Err(AuthError::Unauthorized);
        }

        Ok(session.identity_id)
    }

    /// Invalidates a session. Logging out twice is not an error.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.storage.remove_session(token).await
    }
}

/// Generates an unguessable fixed-length bearer token.
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
