use thiserror::Error;

/// Error types that can occur during account verification operations.
///
/// This enum represents all possible errors that can occur when driving
/// the signup, password-reset, session, and visit-counting flows. Every
/// variant except the system errors is recoverable at the caller's
/// discretion.
///
/// # Error Categories
///
/// - **Registration errors**: `Conflict`
/// - **Code errors**: `NotFound`, `Expired`, `AlreadyConsumed`, `Mismatch`, `TooSoon`
/// - **Session errors**: `InvalidCredentials`, `Unauthorized`
/// - **System errors**: `StorageError`, `CryptoError`
///
/// # Example
///
/// ```rust
/// use otp_auth::{AuthError, AuthServer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = AuthServer::builder().build_and_init().await?;
///
/// match server.verify_signup("some-identity-id", "123456").await {
///     Ok(verified) => println!("signed in as {}", verified.identity.email),
///     Err(AuthError::Mismatch) => println!("wrong code"),
///     Err(AuthError::Expired) => println!("code expired, request a new one"),
///     Err(AuthError::AlreadyConsumed) => println!("code was already used"),
///     Err(AuthError::NotFound) => println!("no pending code for this account"),
///     Err(e) => println!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum AuthError {
    /// An identity with the same email address already exists.
    ///
    /// Email addresses are compared case-insensitively, and an address is
    /// taken as soon as a registration is accepted — a pending, not yet
    /// verified identity also blocks re-registration. The account holder
    /// should resend the verification code instead of registering again.
    #[error("Email already registered")]
    Conflict,

    /// No matching identity or passcode record exists.
    ///
    /// Returned when an identity id does not resolve, when an email lookup
    /// comes up empty, or when a passcode is submitted for an identity and
    /// purpose that have no record at all. Whether this distinction is
    /// surfaced to end users (e.g. for password-reset requests on unknown
    /// emails) is the calling layer's disclosure decision.
    #[error("No matching account or code")]
    NotFound,

    /// The passcode exists but its validity window has elapsed.
    ///
    /// The caller should request a fresh code; expired records are inert
    /// and can never be consumed.
    #[error("Code expired")]
    Expired,

    /// The passcode was already consumed by a previous successful attempt.
    ///
    /// Consuming is exactly-once: submitting the same correct code twice
    /// yields success the first time and this error the second.
    #[error("Code already used")]
    AlreadyConsumed,

    /// The submitted passcode does not equal the stored one.
    ///
    /// Also returned for codes that were superseded by a newer issuance —
    /// only the most recently issued code for a purpose can ever match.
    #[error("Incorrect code")]
    Mismatch,

    /// A new passcode was requested before the resend cooldown elapsed.
    ///
    /// Cooldowns are tracked per identity and purpose; a signup cooldown
    /// does not block a password-reset resend for the same identity.
    #[error("Please wait before requesting another code")]
    TooSoon,

    /// Email/password login failed.
    ///
    /// Covers unknown email, wrong password, and accounts that have not
    /// completed verification. Collapsed into one variant so callers do
    /// not leak which part failed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The bearer token is unknown, expired, or was invalidated.
    ///
    /// Callers holding the rejected token must discard it rather than
    /// retry; see [`crate::client::authorized`].
    #[error("Invalid or expired session")]
    Unauthorized,

    /// A storage backend operation failed.
    ///
    /// Fatal to the individual request but never leaves records
    /// half-updated; every mutation in the storage contract is atomic.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A cryptographic operation failed.
    ///
    /// Covers password hashing failures and system entropy/clock issues.
    #[error("Crypto error: {0}")]
    CryptoError(String),
}
