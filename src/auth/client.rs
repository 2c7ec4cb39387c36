//! Client-held capabilities: the bearer-token cell and the
//! browser-session visit marker.
//!
//! A presentation layer keeps one [`SessionHandle`] per signed-in user and
//! routes every protected call through [`authorized`], which injects the
//! current token and drops it the moment the server rejects it. The
//! equivalent of a per-tab "already visited" flag is [`BrowserSession`].

use std::future::Future;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::auth::error::AuthError;

/// A thread-safe cell for the client's current bearer token.
///
/// The token is stored opaquely; the holder learns nothing from it and
/// must discard it whenever told to. `Debug` does not expose the token.
#[derive(Default)]
pub struct SessionHandle {
    token: RwLock<Option<String>>,
}

impl SessionHandle {
    /// Creates an empty handle (not signed in).
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly issued token, replacing any previous one.
    pub fn store(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = Some(token.into());
    }

    /// Returns a copy of the current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    /// Forgets the current token.
    pub fn discard(&self) {
        *self.token.write().unwrap() = None;
    }

    /// Whether a token is currently held.
    pub fn is_signed_in(&self) -> bool {
        self.token.read().unwrap().is_some()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}

/// Runs a protected call with the current token, discarding the token if
/// the call is rejected.
///
/// This is the request/response interceptor pair as a composable wrapper:
/// the token is injected on the way in, and an
/// [`AuthError::Unauthorized`] on the way out clears the handle before
/// the error propagates — a rejected token is never retried unmodified.
/// Calling without a stored token short-circuits to `Unauthorized`.
///
/// # Example
///
/// ```rust
/// use otp_auth::client::{SessionHandle, authorized};
/// use otp_auth::{AuthError, AuthServer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = AuthServer::builder().build_and_init().await?;
/// let handle = SessionHandle::new();
/// handle.store("some-stale-token");
///
/// let result = authorized(&handle, |token| async move {
///     server.validate(&token).await
/// })
/// .await;
///
/// assert!(matches!(result, Err(AuthError::Unauthorized)));
/// assert!(!handle.is_signed_in()); // token was discarded, not kept for retry
/// # Ok(())
/// # }
/// ```
pub async fn authorized<F, Fut, T>(handle: &SessionHandle, call: F) -> Result<T, AuthError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let token = handle.token().ok_or(AuthError::Unauthorized)?;
    match call(token).await {
        Err(AuthError::Unauthorized) => {
            handle.discard();
            Err(AuthError::Unauthorized)
        }
        other => other,
    }
}

/// A client-side browser-session capability for visit counting.
///
/// Generates one random marker for its lifetime and remembers whether a
/// visit was already counted, so the client can skip redundant calls.
/// The server's marker check-and-set remains the authority; this flag is
/// only an optimization, and replaying the marker is always safe.
#[derive(Debug)]
pub struct BrowserSession {
    marker: String,
    counted: AtomicBool,
}

impl BrowserSession {
    /// Starts a new browser session with a fresh random marker.
    pub fn new() -> Self {
        Self {
            marker: uuid::Uuid::new_v4().to_string(),
            counted: AtomicBool::new(false),
        }
    }

    /// The marker identifying this browser session.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether a visit was already recorded for this session.
    pub fn already_counted(&self) -> bool {
        self.counted.load(Ordering::SeqCst)
    }

    /// Notes that the server has counted (or deduplicated) this session.
    pub fn note_counted(&self) {
        self.counted.store(true, Ordering::SeqCst);
    }
}

impl Default for BrowserSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_round_trip() {
        let handle = SessionHandle::new();
        assert!(!handle.is_signed_in());

        handle.store("tok-1");
        assert_eq!(handle.token().as_deref(), Some("tok-1"));

        handle.discard();
        assert!(handle.token().is_none());
    }

    #[test]
    fn test_handle_debug_hides_token() {
        let handle = SessionHandle::new();
        handle.store("tok-secret");
        let debug = format!("{handle:?}");
        assert!(!debug.contains("tok-secret"));
    }

    #[tokio::test]
    async fn test_authorized_injects_token() {
        let handle = SessionHandle::new();
        handle.store("tok-1");

        let result = authorized(&handle, |token| async move {
            assert_eq!(token, "tok-1");
            Ok::<_, AuthError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert!(handle.is_signed_in());
    }

    #[tokio::test]
    async fn test_authorized_without_token() {
        let handle = SessionHandle::new();
        let result = authorized(&handle, |_| async move { Ok::<_, AuthError>(()) }).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authorized_discards_rejected_token() {
        let handle = SessionHandle::new();
        handle.store("tok-stale");

        let result: Result<(), _> =
            authorized(&handle, |_| async move { Err(AuthError::Unauthorized) }).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
        assert!(!handle.is_signed_in());
    }

    #[tokio::test]
    async fn test_authorized_keeps_token_on_other_errors() {
        let handle = SessionHandle::new();
        handle.store("tok-1");

        let result: Result<(), _> =
            authorized(&handle, |_| async move { Err(AuthError::TooSoon) }).await;
        assert!(matches!(result, Err(AuthError::TooSoon)));
        assert!(handle.is_signed_in());
    }

    #[test]
    fn test_browser_session_markers_are_unique() {
        let a = BrowserSession::new();
        let b = BrowserSession::new();
        assert_ne!(a.marker(), b.marker());
        assert!(!a.already_counted());

        a.note_counted();
        assert!(a.already_counted());
        assert!(!b.already_counted());
    }
}
