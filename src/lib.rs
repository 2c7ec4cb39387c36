//! # OTP Auth
//!
//! A Rust library for email one-time-passcode account verification.
//!
//! This library provides the identity core of a web application: signup
//! with emailed passcodes, password reset, bearer-token sessions, and a
//! per-browser-session visit counter. It owns no transport — a
//! presentation layer (HTTP handlers, an RPC service, a CLI) calls into
//! [`AuthServer`] and maps the results onto its wire format.
//!
//! ## Features
//!
//! - **Six-digit passcodes**: drawn from the OS CSPRNG, zero-padded,
//!   time-limited, one active code per account and purpose
//! - **Exactly-once consumption**: a code verifies once; replays and
//!   superseded codes are rejected with precise error kinds
//! - **Resend cooldown**: per-account, per-purpose rate limit on
//!   reissuing codes
//! - **Bearer sessions**: unguessable opaque tokens, validated on every
//!   protected call, invalidated on logout or expiry
//! - **Visit deduplication**: at most one recorded visit per
//!   browser-session marker, atomic under concurrent replays
//! - **Pluggable storage**: in-memory backend built in, SQLite behind the
//!   `sqlite-storage` feature
//! - **Best-effort delivery**: passcode notification failures are logged,
//!   never fatal to the flow that issued the code
//!
//! ## Quick Start
//!
//! ```rust
//! use otp_auth::storage::AuthStorage;
//! use otp_auth::{AuthServer, Profile, Purpose};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = AuthServer::builder().build_and_init().await?;
//!
//! // Register: creates a pending identity and issues a signup code
//! let identity = server
//!     .register(
//!         "ada@example.com",
//!         "correct horse battery staple",
//!         Profile {
//!             first_name: "Ada".to_string(),
//!             last_name: "Lovelace".to_string(),
//!         },
//!     )
//!     .await?;
//!
//! // In production the code arrives by email; here we read it back
//! // from storage for the sake of the example.
//! let code = server
//!     .storage()
//!     .code_for(&identity.id, Purpose::Signup)
//!     .await?
//!     .expect("signup code on record")
//!     .code;
//!
//! // Verify: activates the account and signs the user in
//! let verified = server.verify_signup(&identity.id, &code).await?;
//! assert_eq!(server.validate(&verified.session.token).await?, identity.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Delivering codes
//!
//! Provide a [`Notifier`] (or a closure) to bridge to your mail
//! infrastructure; dispatch runs in the background under a bounded
//! timeout, and a failed delivery never rolls back the flow:
//!
//! ```rust
//! use otp_auth::AuthServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = AuthServer::builder()
//!     .with_notifier_fn(|recipient, purpose, code| async move {
//!         // hand (recipient, purpose, code) to your mailer here
//!         let _ = (recipient, purpose, code);
//!         Ok(())
//!     })
//!     .build_and_init()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`AuthServer`]**: the boundary facade a presentation layer calls
//! - **[`CodeStore`] / [`SessionManager`] / [`VisitCounter`]**: the flow
//!   components behind it, usable individually
//! - **[`client::SessionHandle`]**: client-held token cell whose
//!   [`client::authorized`] wrapper discards tokens the server rejects
//! - **[`storage::AuthStorage`]**: the persistence contract; every
//!   race-sensitive decision (consume-once, cooldown, marker
//!   check-and-set) is atomic inside the backend
//! - **[`AuthError`]**: comprehensive error handling for all failure modes

pub mod auth;

// Re-export commonly used types
pub use auth::{
    AuthConfig, AuthError, AuthServer, AuthServerBuilder, CODE_DIGITS, CodeStore, ConfigPreset,
    Identity, OtpRecord, Profile, Purpose, Session, SessionManager, VerificationStatus, Verified,
    VisitCounter, VisitOutcome,
};

pub use auth::{client, notify, password, storage};

pub use auth::{Notifier, NullNotifier};
