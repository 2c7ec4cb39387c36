//! SQLite storage backend implementation.
//!
//! This module provides a persistent SQLite storage backend for the
//! verification flows. It's ideal for single-instance applications that
//! need records to survive restarts.

use super::{AuthStorage, StorageStats};
use crate::auth::error::AuthError;
use crate::auth::record::{
    Identity, OtpRecord, Profile, Purpose, Session, VerificationStatus, VisitOutcome,
};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn db_err(e: impl ToString) -> AuthError {
    AuthError::StorageError(e.to_string())
}

/// SQLite-based storage backend.
///
/// The connection sits behind a `Mutex`, so each trait method is one
/// critical section and the check-and-set contracts of [`AuthStorage`]
/// hold without extra transactions. Uniqueness of emails and visit
/// markers is additionally enforced by the schema, and the passcode
/// table's primary key is the (identity, purpose) pair — superseding a
/// code is a plain upsert.
///
/// # Example
///
/// ```rust
/// use otp_auth::storage::SqliteStorage;
///
/// # fn example() -> Result<(), otp_auth::AuthError> {
/// // File-based storage
/// let storage = SqliteStorage::new("./data/otp_auth.db")?;
///
/// // In-memory storage (for testing)
/// let memory_storage = SqliteStorage::new(":memory:")?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteStorage {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage backend.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file, or ":memory:" for
    ///   an in-memory database
    pub fn new(db_path: &str) -> Result<Self, AuthError> {
        let connection = if db_path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(db_path)
        };

        let connection = connection.map_err(db_err)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Create the database schema if it doesn't exist.
    fn init_schema(&self) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS identity (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                credential_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS otp_code (
                identity_id TEXT NOT NULL,
                purpose TEXT NOT NULL,
                code TEXT NOT NULL,
                issued_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                consumed INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (identity_id, purpose)
            );
            CREATE TABLE IF NOT EXISTS session (
                token TEXT PRIMARY KEY,
                identity_id TEXT NOT NULL,
                issued_at INTEGER NOT NULL,
                expires_at INTEGER
            );
            CREATE TABLE IF NOT EXISTS visit_marker (
                marker TEXT PRIMARY KEY,
                first_seen INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_code_expiry ON otp_code (expires_at);
            CREATE INDEX IF NOT EXISTS idx_session_expiry ON session (expires_at);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Identity, String)> {
        let status: String = row.get(5)?;
        Ok((
            Identity {
                id: row.get(0)?,
                email: row.get(1)?,
                credential_hash: row.get(2)?,
                profile: Profile {
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                },
                // patched up by the caller once parsed
                status: VerificationStatus::Unverified,
                created_at: row.get(6)?,
            },
            status,
        ))
    }

    fn identity_query(
        conn: &Connection,
        where_clause: &str,
        key: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let sql = format!(
            "SELECT id, email, credential_hash, first_name, last_name, status, created_at \
             FROM identity WHERE {where_clause} = ?1"
        );
        let row = conn
            .query_row(&sql, params![key], Self::row_to_identity)
            .optional()
            .map_err(db_err)?;

        match row {
            Some((mut identity, status)) => {
                identity.status = VerificationStatus::parse(&status)?;
                Ok(Some(identity))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthStorage for SqliteStorage {
    async fn init(&self) -> Result<(), AuthError> {
        self.init_schema()
    }

    async fn insert_identity(&self, identity: Identity) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();

        conn.execute(
            "INSERT INTO identity (id, email, credential_hash, first_name, last_name, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                identity.id,
                identity.email,
                identity.credential_hash,
                identity.profile.first_name,
                identity.profile.last_name,
                identity.status.as_str(),
                identity.created_at,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(sqlite_err, _)
                if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                AuthError::Conflict
            }
            _ => db_err(e),
        })?;

        Ok(())
    }

    async fn identity_by_id(&self, id: &str) -> Result<Option<Identity>, AuthError> {
        let conn = self.connection.lock().unwrap();
        Self::identity_query(&conn, "id", id)
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let conn = self.connection.lock().unwrap();
        Self::identity_query(&conn, "email", email)
    }

    async fn set_status(&self, id: &str, status: VerificationStatus) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE identity SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn set_credential_hash(&self, id: &str, credential_hash: &str) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE identity SET credential_hash = ?1 WHERE id = ?2",
                params![credential_hash, id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn store_code(
        &self,
        record: OtpRecord,
        cooldown: Option<Duration>,
    ) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();

        if let Some(cooldown) = cooldown {
            let prior_issued_at: Option<i64> = conn
                .query_row(
                    "SELECT issued_at FROM otp_code WHERE identity_id = ?1 AND purpose = ?2",
                    params![record.identity_id, record.purpose.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            if let Some(prior) = prior_issued_at {
                if record.issued_at - prior < cooldown.as_secs() as i64 {
                    return Err(AuthError::TooSoon);
                }
            }
        }

        conn.execute(
            "INSERT INTO otp_code (identity_id, purpose, code, issued_at, expires_at, consumed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT (identity_id, purpose) DO UPDATE SET \
             code = excluded.code, issued_at = excluded.issued_at, \
             expires_at = excluded.expires_at, consumed = excluded.consumed",
            params![
                record.identity_id,
                record.purpose.as_str(),
                record.code,
                record.issued_at,
                record.expires_at,
                record.consumed,
            ],
        )
        .map_err(db_err)?;

        Ok(())
    }

    async fn code_for(
        &self,
        identity_id: &str,
        purpose: Purpose,
    ) -> Result<Option<OtpRecord>, AuthError> {
        let conn = self.connection.lock().unwrap();

        conn.query_row(
            "SELECT code, issued_at, expires_at, consumed FROM otp_code \
             WHERE identity_id = ?1 AND purpose = ?2",
            params![identity_id, purpose.as_str()],
            |row| {
                Ok(OtpRecord {
                    identity_id: identity_id.to_string(),
                    purpose,
                    code: row.get(0)?,
                    issued_at: row.get(1)?,
                    expires_at: row.get(2)?,
                    consumed: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    async fn consume_code(
        &self,
        identity_id: &str,
        purpose: Purpose,
        supplied: &str,
        now: i64,
    ) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();

        let row: Option<(String, i64, bool)> = conn
            .query_row(
                "SELECT code, expires_at, consumed FROM otp_code \
                 WHERE identity_id = ?1 AND purpose = ?2",
                params![identity_id, purpose.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(db_err)?;

        let (code, expires_at, consumed) = row.ok_or(AuthError::NotFound)?;
        if now > expires_at {
            return Err(AuthError::Expired);
        }
        if consumed {
            return Err(AuthError::AlreadyConsumed);
        }
        if code != supplied {
            return Err(AuthError::Mismatch);
        }

        conn.execute(
            "UPDATE otp_code SET consumed = 1 WHERE identity_id = ?1 AND purpose = ?2",
            params![identity_id, purpose.as_str()],
        )
        .map_err(db_err)?;

        Ok(())
    }

    async fn insert_session(&self, session: Session) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO session (token, identity_id, issued_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.identity_id,
                session.issued_at,
                session.expires_at,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let conn = self.connection.lock().unwrap();
        conn.query_row(
            "SELECT identity_id, issued_at, expires_at FROM session WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: token.to_string(),
                    identity_id: row.get(0)?,
                    issued_at: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    async fn remove_session(&self, token: &str) -> Result<(), AuthError> {
        let conn = self.connection.lock().unwrap();
        conn.execute("DELETE FROM session WHERE token = ?1", params![token])
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_visit(&self, marker: &str) -> Result<VisitOutcome, AuthError> {
        let now = crate::auth::time_utils::current_timestamp()?;
        let conn = self.connection.lock().unwrap();

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO visit_marker (marker, first_seen) VALUES (?1, ?2)",
                params![marker, now],
            )
            .map_err(db_err)?;

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM visit_marker", [], |row| row.get(0))
            .map_err(db_err)?;

        Ok(VisitOutcome {
            counted: inserted == 1,
            total: total as u64,
        })
    }

    async fn visit_total(&self) -> Result<u64, AuthError> {
        let conn = self.connection.lock().unwrap();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM visit_marker", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(total as u64)
    }

    async fn cleanup_expired(&self, now: i64) -> Result<usize, AuthError> {
        let conn = self.connection.lock().unwrap();

        let codes = conn
            .execute("DELETE FROM otp_code WHERE expires_at < ?1", params![now])
            .map_err(db_err)?;
        let sessions = conn
            .execute(
                "DELETE FROM session WHERE expires_at IS NOT NULL AND expires_at < ?1",
                params![now],
            )
            .map_err(db_err)?;

        Ok(codes + sessions)
    }

    async fn get_stats(&self) -> Result<StorageStats, AuthError> {
        let conn = self.connection.lock().unwrap();

        let count = |sql: &str| -> Result<i64, AuthError> {
            conn.query_row(sql, [], |row| row.get(0)).map_err(db_err)
        };

        let identities = count("SELECT COUNT(*) FROM identity")?;
        let codes = count("SELECT COUNT(*) FROM otp_code")?;
        let sessions = count("SELECT COUNT(*) FROM session")?;
        let visit_total = count("SELECT COUNT(*) FROM visit_marker")?;

        let pages: i64 = conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(StorageStats {
            identities: identities as usize,
            codes: codes as usize,
            sessions: sessions as usize,
            visit_total: visit_total as u64,
            backend_info: format!("SQLite storage ({} bytes)", pages * page_size),
        })
    }
}
