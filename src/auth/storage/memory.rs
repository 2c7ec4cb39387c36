//! In-memory storage backend implementation.
//!
//! This module provides a simple in-memory storage backend that keeps all
//! records in HashMaps behind a single RwLock. It's ideal for testing,
//! development, and single-instance applications where persistence across
//! restarts is not required.

use super::{AuthStorage, StorageStats};
use crate::auth::error::AuthError;
use crate::auth::record::{Identity, OtpRecord, Purpose, Session, VerificationStatus, VisitOutcome};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    /// id → identity
    identities: HashMap<String, Identity>,
    /// lowercased email → id
    email_index: HashMap<String, String>,
    /// (identity id, purpose) → the single current record
    codes: HashMap<(String, Purpose), OtpRecord>,
    /// token → session
    sessions: HashMap<String, Session>,
    markers: HashSet<String>,
    visit_total: u64,
}

/// A simple in-memory storage implementation for testing and
/// single-instance applications.
///
/// All maps live behind one `tokio::sync::RwLock`, so every mutating
/// operation of the [`AuthStorage`] contract is a single critical section:
/// cooldown-checked code replacement, match-and-consume, and marker
/// check-and-set are linearized for free. Data is lost when the
/// application restarts.
///
/// # Example
///
/// ```rust
/// use otp_auth::storage::{AuthStorage, MemoryStorage};
///
/// # async fn example() -> Result<(), otp_auth::AuthError> {
/// let storage = MemoryStorage::new();
///
/// let outcome = storage.record_visit("marker-1").await?;
/// assert!(outcome.counted);
/// let outcome = storage.record_visit("marker-1").await?;
/// assert!(!outcome.counted);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    /// Creates a new in-memory storage instance.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStorage for MemoryStorage {
    async fn insert_identity(&self, identity: Identity) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        if inner.email_index.contains_key(&identity.email) {
            return Err(AuthError::Conflict);
        }
        inner
            .email_index
            .insert(identity.email.clone(), identity.id.clone());
        inner.identities.insert(identity.id.clone(), identity);
        Ok(())
    }

    async fn identity_by_id(&self, id: &str) -> Result<Option<Identity>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.identities.get(id).cloned())
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .email_index
            .get(email)
            .and_then(|id| inner.identities.get(id))
            .cloned())
    }

    async fn set_status(&self, id: &str, status: VerificationStatus) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        match inner.identities.get_mut(id) {
            Some(identity) => {
                identity.status = status;
                Ok(())
            }
            None => Err(AuthError::NotFound),
        }
    }

    async fn set_credential_hash(&self, id: &str, credential_hash: &str) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        match inner.identities.get_mut(id) {
            Some(identity) => {
                identity.credential_hash = credential_hash.to_string();
                Ok(())
            }
            None => Err(AuthError::NotFound),
        }
    }

    async fn store_code(
        &self,
        record: OtpRecord,
        cooldown: Option<Duration>,
    ) -> Result<(), AuthError> {
        let key = (record.identity_id.clone(), record.purpose);
        let mut inner = self.inner.write().await;
        if let (Some(cooldown), Some(existing)) = (cooldown, inner.codes.get(&key)) {
            if record.issued_at - existing.issued_at < cooldown.as_secs() as i64 {
                return Err(AuthError::TooSoon);
            }
        }
        inner.codes.insert(key, record);
        Ok(())
    }

    async fn code_for(
        &self,
        identity_id: &str,
        purpose: Purpose,
    ) -> Result<Option<OtpRecord>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .codes
            .get(&(identity_id.to_string(), purpose))
            .cloned())
    }

    async fn consume_code(
        &self,
        identity_id: &str,
        purpose: Purpose,
        supplied: &str,
        now: i64,
    ) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .codes
            .get_mut(&(identity_id.to_string(), purpose))
            .ok_or(AuthError::NotFound)?;
        if record.is_expired(now) {
            return Err(AuthError::Expired);
        }
        if record.consumed {
            return Err(AuthError::AlreadyConsumed);
        }
        if record.code != supplied {
            return Err(AuthError::Mismatch);
        }
        record.consumed = true;
        Ok(())
    }

    async fn insert_session(&self, session: Session) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(token).cloned())
    }

    async fn remove_session(&self, token: &str) -> Result<(), AuthError> {
        let mut inner = self.inner.write().await;
        inner.sessions.remove(token);
        Ok(())
    }

    async fn record_visit(&self, marker: &str) -> Result<VisitOutcome, AuthError> {
        let mut inner = self.inner.write().await;
        let counted = inner.markers.insert(marker.to_string());
        if counted {
            inner.visit_total += 1;
        }
        Ok(VisitOutcome {
            counted,
            total: inner.visit_total,
        })
    }

    async fn visit_total(&self) -> Result<u64, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.visit_total)
    }

    async fn cleanup_expired(&self, now: i64) -> Result<usize, AuthError> {
        let mut inner = self.inner.write().await;
        let before = inner.codes.len() + inner.sessions.len();
        inner.codes.retain(|_, record| !record.is_expired(now));
        inner.sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - (inner.codes.len() + inner.sessions.len()))
    }

    async fn get_stats(&self) -> Result<StorageStats, AuthError> {
        let inner = self.inner.read().await;
        Ok(StorageStats {
            identities: inner.identities.len(),
            codes: inner.codes.len(),
            sessions: inner.sessions.len(),
            visit_total: inner.visit_total,
            backend_info: "In-memory HashMap storage".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::record::Profile;

    fn identity(email: &str) -> Identity {
        Identity::new(
            email.to_string(),
            "$argon2id$stub".to_string(),
            Profile {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            },
            1_700_000_000,
        )
    }

    fn code(identity_id: &str, purpose: Purpose, code: &str, issued_at: i64) -> OtpRecord {
        OtpRecord::new(
            identity_id.to_string(),
            purpose,
            code.to_string(),
            issued_at,
            issued_at + 1800,
        )
    }

    #[tokio::test]
    async fn test_identity_conflict_on_duplicate_email() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        storage.insert_identity(identity("a@x.com")).await?;

        let result = storage.insert_identity(identity("a@x.com")).await;
        assert!(matches!(result, Err(AuthError::Conflict)));
        Ok(())
    }

    #[tokio::test]
    async fn test_identity_lookup() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let id = identity("a@x.com");
        let identity_id = id.id.clone();
        storage.insert_identity(id).await?;

        assert!(storage.identity_by_id(&identity_id).await?.is_some());
        assert!(storage.identity_by_email("a@x.com").await?.is_some());
        assert!(storage.identity_by_email("b@x.com").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_status() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let id = identity("a@x.com");
        let identity_id = id.id.clone();
        storage.insert_identity(id).await?;

        storage
            .set_status(&identity_id, VerificationStatus::Active)
            .await?;
        let stored = storage.identity_by_id(&identity_id).await?.unwrap();
        assert_eq!(stored.status, VerificationStatus::Active);

        let result = storage
            .set_status("missing", VerificationStatus::Active)
            .await;
        assert!(matches!(result, Err(AuthError::NotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_code_supersedes() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", 1_700_000_000), None)
            .await?;
        storage
            .store_code(code("id-1", Purpose::Signup, "222222", 1_700_000_100), None)
            .await?;

        let stored = storage.code_for("id-1", Purpose::Signup).await?.unwrap();
        assert_eq!(stored.code, "222222");
        Ok(())
    }

    #[tokio::test]
    async fn test_store_code_cooldown() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let cooldown = Some(Duration::from_secs(30));
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", 1_700_000_000), None)
            .await?;

        // Within the window
        let result = storage
            .store_code(
                code("id-1", Purpose::Signup, "222222", 1_700_000_010),
                cooldown,
            )
            .await;
        assert!(matches!(result, Err(AuthError::TooSoon)));
        let stored = storage.code_for("id-1", Purpose::Signup).await?.unwrap();
        assert_eq!(stored.code, "111111");

        // After the window
        storage
            .store_code(
                code("id-1", Purpose::Signup, "222222", 1_700_000_030),
                cooldown,
            )
            .await?;
        let stored = storage.code_for("id-1", Purpose::Signup).await?.unwrap();
        assert_eq!(stored.code, "222222");
        Ok(())
    }

    #[tokio::test]
    async fn test_cooldown_does_not_cross_purposes() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let cooldown = Some(Duration::from_secs(30));
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", 1_700_000_000), None)
            .await?;

        // A fresh PasswordReset issuance is not blocked by the Signup one
        storage
            .store_code(
                code("id-1", Purpose::PasswordReset, "222222", 1_700_000_001),
                cooldown,
            )
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_consume_code_error_order() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let now = 1_700_000_100;

        // No record
        let result = storage
            .consume_code("id-1", Purpose::Signup, "111111", now)
            .await;
        assert!(matches!(result, Err(AuthError::NotFound)));

        // Expired beats everything else
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", 1_600_000_000), None)
            .await?;
        let result = storage
            .consume_code("id-1", Purpose::Signup, "999999", now)
            .await;
        assert!(matches!(result, Err(AuthError::Expired)));

        // Mismatch on a live record
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", now - 10), None)
            .await?;
        let result = storage
            .consume_code("id-1", Purpose::Signup, "999999", now)
            .await;
        assert!(matches!(result, Err(AuthError::Mismatch)));

        // Success, then AlreadyConsumed with the same correct code
        storage
            .consume_code("id-1", Purpose::Signup, "111111", now)
            .await?;
        let result = storage
            .consume_code("id-1", Purpose::Signup, "111111", now)
            .await;
        assert!(matches!(result, Err(AuthError::AlreadyConsumed)));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let storage = Arc::new(MemoryStorage::new());
        let now = 1_700_000_100;
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", now - 10), None)
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .consume_code("id-1", Purpose::Signup, "111111", now)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_sessions() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let session = Session {
            token: "tok-1".to_string(),
            identity_id: "id-1".to_string(),
            issued_at: 1_700_000_000,
            expires_at: None,
        };
        storage.insert_session(session).await?;

        assert!(storage.session_by_token("tok-1").await?.is_some());
        storage.remove_session("tok-1").await?;
        assert!(storage.session_by_token("tok-1").await?.is_none());
        // Idempotent
        storage.remove_session("tok-1").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_visit_marker_counts_once() {
        let storage = Arc::new(MemoryStorage::new());

        let mut handles = vec![];
        for _ in 0..16 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(
                async move { storage.record_visit("marker-1").await },
            ));
        }

        let mut counted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().counted {
                counted += 1;
            }
        }
        assert_eq!(counted, 1);
        assert_eq!(storage.visit_total().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        let now = 1_700_010_000;
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", now - 3600), None)
            .await?;
        storage
            .store_code(code("id-2", Purpose::Signup, "222222", now - 10), None)
            .await?;
        storage
            .insert_session(Session {
                token: "tok-old".to_string(),
                identity_id: "id-1".to_string(),
                issued_at: now - 7200,
                expires_at: Some(now - 1),
            })
            .await?;
        storage
            .insert_session(Session {
                token: "tok-live".to_string(),
                identity_id: "id-2".to_string(),
                issued_at: now,
                expires_at: Some(now + 3600),
            })
            .await?;

        let removed = storage.cleanup_expired(now).await?;
        assert_eq!(removed, 2);
        assert!(storage.code_for("id-1", Purpose::Signup).await?.is_none());
        assert!(storage.code_for("id-2", Purpose::Signup).await?.is_some());
        assert!(storage.session_by_token("tok-old").await?.is_none());
        assert!(storage.session_by_token("tok-live").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_stats() -> Result<(), AuthError> {
        let storage = MemoryStorage::new();
        storage.insert_identity(identity("a@x.com")).await?;
        storage
            .store_code(code("id-1", Purpose::Signup, "111111", 1_700_000_000), None)
            .await?;
        storage.record_visit("m-1").await?;
        storage.record_visit("m-2").await?;

        let stats = storage.get_stats().await?;
        assert_eq!(stats.identities, 1);
        assert_eq!(stats.codes, 1);
        assert_eq!(stats.sessions, 0);
        assert_eq!(stats.visit_total, 2);
        assert!(stats.backend_info.contains("In-memory"));
        Ok(())
    }
}
