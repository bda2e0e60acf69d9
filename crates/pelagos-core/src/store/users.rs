use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::{PelagosError, Result};
use crate::models::{AuthSession, UserAccount};

use super::FerryStore;

pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
pub const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@ferrysearch.com";
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin123";

impl FerryStore {
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<UserAccount> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() {
            return Err(PelagosError::Validation(
                "username and email must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(PelagosError::Validation(
                "password must not be empty".to_string(),
            ));
        }
        let password_hash = hash_password(password);
        self.with_tx(|tx| {
            let taken = tx
                .query_row(
                    "SELECT 1 FROM users WHERE username = ?1 OR email = ?2 LIMIT 1",
                    params![username, email],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if taken {
                return Err(PelagosError::Conflict(format!(
                    "user {username} already exists"
                )));
            }
            tx.execute(
                r"
                INSERT INTO users(username, email, password_hash, is_admin, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    username,
                    email,
                    password_hash,
                    i64::from(is_admin),
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(UserAccount {
                id: tx.last_insert_rowid(),
                username: username.to_string(),
                email: email.to_string(),
                is_admin,
            })
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, email, is_admin FROM users WHERE username = ?1",
                    params![username.trim()],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Checks a login attempt; `None` covers both unknown users and wrong
    /// passwords so callers cannot distinguish the two.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<Option<UserAccount>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    r"
                    SELECT id, username, email, is_admin, password_hash
                    FROM users
                    WHERE username = ?1
                    ",
                    params![username.trim()],
                    |row| {
                        Ok((
                            user_from_row(row)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;
            match row {
                Some((user, stored)) if verify_password_hash(&stored, password) => Ok(Some(user)),
                _ => Ok(None),
            }
        })
    }

    /// Creates the default admin account when no users exist yet. Returns
    /// whether an account was created; the caller is expected to warn that
    /// the stock password must be changed.
    pub fn ensure_bootstrap_admin(&self) -> Result<bool> {
        let existing = self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })?;
        if existing > 0 {
            return Ok(false);
        }
        self.create_user(
            BOOTSTRAP_ADMIN_USERNAME,
            BOOTSTRAP_ADMIN_EMAIL,
            BOOTSTRAP_ADMIN_PASSWORD,
            true,
        )?;
        Ok(true)
    }

    pub fn create_auth_session(&self, user_id: i64, ttl_secs: u64) -> Result<AuthSession> {
        let now = Utc::now();
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let session = AuthSession {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at: now + Duration::seconds(ttl),
        };
        self.with_conn(|conn| {
            conn.execute(
                r"
                INSERT INTO auth_sessions(token, user_id, created_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![
                    session.token,
                    session.user_id,
                    session.created_at.to_rfc3339(),
                    session.expires_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })?;
        Ok(session)
    }

    /// Resolves a session token to its user, ignoring expired sessions.
    pub fn lookup_auth_session(&self, token: &str) -> Result<Option<UserAccount>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    r"
                    SELECT u.id, u.username, u.email, u.is_admin, s.expires_at
                    FROM auth_sessions s
                    JOIN users u ON u.id = s.user_id
                    WHERE s.token = ?1
                    ",
                    params![token],
                    |row| Ok((user_from_row(row)?, row.get::<_, String>(4)?)),
                )
                .optional()?;
            let Some((user, expires_at)) = row else {
                return Ok(None);
            };
            let still_valid = DateTime::parse_from_rfc3339(&expires_at)
                .map(|when| when.with_timezone(&Utc) > Utc::now())
                .unwrap_or(false);
            if still_valid { Ok(Some(user)) } else { Ok(None) }
        })
    }

    pub fn delete_auth_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected =
                conn.execute("DELETE FROM auth_sessions WHERE token = ?1", params![token])?;
            Ok(affected > 0)
        })
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM auth_sessions WHERE expires_at <= ?1",
                params![Utc::now().to_rfc3339()],
            )?;
            Ok(affected)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        is_admin: row.get::<_, i64>(3)? != 0,
    })
}

fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest(&salt, password);
    format!("b3${salt}${}", digest.to_hex())
}

fn salted_digest(salt: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize()
}

fn verify_password_hash(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("b3"), Some(salt), Some(hex)) => match blake3::Hash::from_hex(hex) {
            Ok(expected) => salted_digest(salt, password) == expected,
            Err(_) => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password_hash};

    #[test]
    fn password_hashes_are_salted_and_verify() {
        let first = hash_password("poseidon");
        let second = hash_password("poseidon");
        assert_ne!(first, second, "salts must differ per hash");
        assert!(verify_password_hash(&first, "poseidon"));
        assert!(verify_password_hash(&second, "poseidon"));
        assert!(!verify_password_hash(&first, "Poseidon"));
    }

    #[test]
    fn malformed_stored_hashes_never_verify() {
        assert!(!verify_password_hash("", "x"));
        assert!(!verify_password_hash("plaintext", "plaintext"));
        assert!(!verify_password_hash("b3$onlysalt", "x"));
        assert!(!verify_password_hash("b3$salt$nothex", "x"));
    }
}
