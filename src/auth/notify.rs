//! Passcode delivery to the account holder.
//!
//! Delivery transport (email, SMS, a queue) lives outside this crate;
//! implementors of [`Notifier`] bridge to it. Dispatch is best-effort: the
//! flows that trigger a notification never fail because delivery did.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::error::AuthError;
use crate::auth::record::Purpose;

/// Delivers a passcode to a recipient.
///
/// Implementations should return an error on delivery failure; the caller
/// treats it as a soft warning, never as a failure of the surrounding
/// state transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, purpose: Purpose, code: &str) -> Result<(), AuthError>;
}

/// A notifier that drops every message.
///
/// Useful in tests and in development setups where codes are read from
/// logs or the storage backend instead of a mailbox.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _recipient: &str, _purpose: Purpose, _code: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Wrapper for custom notifiers provided via closures.
///
/// This allows delivery logic to be supplied as a closure returning a
/// future, without a named type.
///
/// # Example
///
/// ```rust
/// use otp_auth::notify::CustomNotifier;
///
/// let notifier = CustomNotifier::new(|recipient, purpose, _code| async move {
///     println!("would deliver a {purpose} code to {recipient}");
///     Ok(())
/// });
/// ```
pub struct CustomNotifier<F, Fut>
where
    F: Fn(String, Purpose, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AuthError>> + Send + 'static,
{
    send_fn: F,
}

impl<F, Fut> CustomNotifier<F, Fut>
where
    F: Fn(String, Purpose, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AuthError>> + Send + 'static,
{
    pub fn new(send_fn: F) -> Self {
        Self { send_fn }
    }
}

#[async_trait]
impl<F, Fut> Notifier for CustomNotifier<F, Fut>
where
    F: Fn(String, Purpose, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AuthError>> + Send + 'static,
{
    async fn send(&self, recipient: &str, purpose: Purpose, code: &str) -> Result<(), AuthError> {
        (self.send_fn)(recipient.to_string(), purpose, code.to_string()).await
    }
}

/// Fire-and-forget dispatch with a bounded timeout.
///
/// Runs in a background task so the caller is never blocked on delivery;
/// a timeout or delivery error is logged and swallowed. The code stays
/// issued and valid either way. The code itself is never logged.
pub(crate) fn dispatch(
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    recipient: String,
    purpose: Purpose,
    code: String,
) {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, notifier.send(&recipient, purpose, &code)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(%recipient, %purpose, "code delivery failed: {e}");
            }
            Err(_) => {
                tracing::warn!(%recipient, %purpose, "code delivery timed out after {timeout:?}");
            }
        }
    });
}
