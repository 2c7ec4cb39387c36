use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::error::AuthError;

/// Which flow a one-time passcode belongs to.
///
/// Codes for different purposes never cross-validate: a signup code cannot
/// reset a password and vice versa. Cooldowns and the single-active-code
/// rule are likewise tracked per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Account activation after registration.
    Signup,
    /// Credential replacement for an active account.
    PasswordReset,
}

impl Purpose {
    /// Stable string form, used by storage backends and notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Signup => "signup",
            Purpose::PasswordReset => "password_reset",
        }
    }

    /// Parses the stable string form produced by [`Purpose::as_str`].
    pub(crate) fn parse(s: &str) -> Result<Self, AuthError> {
        match s {
            "signup" => Ok(Purpose::Signup),
            "password_reset" => Ok(Purpose::PasswordReset),
            other => Err(AuthError::StorageError(format!(
                "unknown purpose value: {other}"
            ))),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an identity.
///
/// Signup drives `PendingVerification → Active`; a password reset is
/// logically `Active → PendingReset → Active`, but `PendingReset` is never
/// written to storage — an active identity is reset-eligible purely by
/// holding an unconsumed password-reset code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Known but not yet enrolled in verification.
    Unverified,
    /// Registered, awaiting a correct signup code.
    PendingVerification,
    /// Fully verified; may log in.
    Active,
    /// Reset code outstanding. Logical state only, see above.
    PendingReset,
}

impl VerificationStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::PendingVerification => "pending_verification",
            VerificationStatus::Active => "active",
            VerificationStatus::PendingReset => "pending_reset",
        }
    }

    pub(crate) fn parse(s: &str) -> Result<Self, AuthError> {
        match s {
            "unverified" => Ok(VerificationStatus::Unverified),
            "pending_verification" => Ok(VerificationStatus::PendingVerification),
            "active" => Ok(VerificationStatus::Active),
            "pending_reset" => Ok(VerificationStatus::PendingReset),
            other => Err(AuthError::StorageError(format!(
                "unknown status value: {other}"
            ))),
        }
    }
}

/// Display attributes carried by an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
}

/// A registered account.
///
/// Created on registration and mutated only through the verification flows;
/// identities are never deleted by this crate. The credential hash is kept
/// out of serialized output.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    /// Unique identifier, a v4 UUID string.
    pub id: String,
    /// Unique email address, stored lowercased.
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub profile: Profile,
    pub status: VerificationStatus,
    /// Unix timestamp (seconds) of registration.
    pub created_at: i64,
}

impl Identity {
    /// Creates a fresh identity in `PendingVerification`.
    ///
    /// The email is expected to be lowercased by the caller.
    pub(crate) fn new(email: String, credential_hash: String, profile: Profile, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            credential_hash,
            profile,
            status: VerificationStatus::PendingVerification,
            created_at: now,
        }
    }
}

/// A stored one-time passcode.
///
/// At most one record exists per (identity, purpose) pair; issuing a new
/// code replaces the previous record outright, which is what makes an
/// older, still-unexpired code unmatchable.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub identity_id: String,
    pub purpose: Purpose,
    /// Fixed-width numeric code, zero-padded to six digits.
    pub code: String,
    /// Unix timestamp (seconds) of issuance. Also the cooldown anchor.
    pub issued_at: i64,
    /// Unix timestamp (seconds) after which the code is inert.
    pub expires_at: i64,
    /// Set exactly once by a successful consume.
    pub consumed: bool,
}

impl OtpRecord {
    pub(crate) fn new(
        identity_id: String,
        purpose: Purpose,
        code: String,
        issued_at: i64,
        expires_at: i64,
    ) -> Self {
        Self {
            identity_id,
            purpose,
            code,
            issued_at,
            expires_at,
            consumed: false,
        }
    }

    /// Whether the validity window has elapsed.
    pub fn is_expired(&self, now: i64) -> bool {
        crate::auth::time_utils::is_past(self.expires_at, now)
    }
}

/// An issued bearer session.
///
/// The token is the sole proof of the session; it is handed to the caller
/// once and otherwise never listed or logged. `Debug` redacts it.
#[derive(Clone, Serialize)]
pub struct Session {
    /// Opaque bearer token, 64 hex characters.
    pub token: String,
    pub identity_id: String,
    /// Unix timestamp (seconds) of issuance.
    pub issued_at: i64,
    /// Unix timestamp (seconds) of expiry, if the session expires at all.
    pub expires_at: Option<i64>,
}

impl Session {
    /// Whether this session's expiry, if any, has passed.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|deadline| crate::auth::time_utils::is_past(deadline, now))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("identity_id", &self.identity_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a successful signup verification or login.
#[derive(Debug, Clone, Serialize)]
pub struct Verified {
    pub session: Session,
    pub identity: Identity,
}

/// Outcome of a visit-recording call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitOutcome {
    /// Whether this call was the first sighting of the marker.
    pub counted: bool,
    /// Total distinct markers observed so far.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_round_trip() {
        for purpose in [Purpose::Signup, Purpose::PasswordReset] {
            assert_eq!(Purpose::parse(purpose.as_str()).unwrap(), purpose);
        }
        assert!(Purpose::parse("nonsense").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            VerificationStatus::Unverified,
            VerificationStatus::PendingVerification,
            VerificationStatus::Active,
            VerificationStatus::PendingReset,
        ] {
            assert_eq!(VerificationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(VerificationStatus::parse("half_verified").is_err());
    }

    #[test]
    fn test_new_identity_is_pending() {
        let identity = Identity::new(
            "a@x.com".to_string(),
            "$argon2id$stub".to_string(),
            Profile {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            },
            1_700_000_000,
        );
        assert_eq!(identity.status, VerificationStatus::PendingVerification);
        assert!(!identity.id.is_empty());
    }

    #[test]
    fn test_identity_serialization_skips_hash() {
        let identity = Identity::new(
            "a@x.com".to_string(),
            "$argon2id$stub".to_string(),
            Profile {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            },
            1_700_000_000,
        );
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_otp_record_expiry() {
        let record = OtpRecord::new(
            "id-1".to_string(),
            Purpose::Signup,
            "042617".to_string(),
            1_700_000_000,
            1_700_001_800,
        );
        assert!(!record.is_expired(1_700_001_800));
        assert!(record.is_expired(1_700_001_801));
        assert!(!record.consumed);
    }

    #[test]
    fn test_session_expiry() {
        let session = Session {
            token: "aa".repeat(32),
            identity_id: "id-1".to_string(),
            issued_at: 1_700_000_000,
            expires_at: Some(1_700_086_400),
        };
        assert!(!session.is_expired(1_700_000_100));
        assert!(session.is_expired(1_700_086_401));

        let eternal = Session {
            expires_at: None,
            ..session
        };
        assert!(!eternal.is_expired(i64::MAX));
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session {
            token: "super-secret-token".to_string(),
            identity_id: "id-1".to_string(),
            issued_at: 0,
            expires_at: None,
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
