//! Token authentication backed by the `api_tokens` table.
//!
//! Tokens are opaque `smvd_`-prefixed strings. Only the SHA-256 hash is
//! stored; the plaintext is shown once at issue time. Resolution updates
//! `last_used_at` best-effort without failing the request.

use rand::RngCore;
use samvad_core::auth::{Auth, Identity};
use samvad_types::error::{AuthError, RepositoryError};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::map_sqlx_error;
use super::pool::DatabasePool;

/// SQLite-backed implementation of the `Auth` port.
pub struct SqliteTokenAuth {
    pool: DatabasePool,
}

impl SqliteTokenAuth {
    /// Create a new resolver backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Issue a fresh token for a user, returning the plaintext (shown to
    /// the caller once; only its hash is stored).
    pub async fn issue(&self, user_id: &Uuid) -> Result<String, RepositoryError> {
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        let plaintext = format!(
            "smvd_{}",
            key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
        );

        sqlx::query(
            "INSERT INTO api_tokens (id, token_hash, user_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(hash_token(&plaintext))
        .bind(user_id.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(plaintext)
    }
}

impl Auth for SqliteTokenAuth {
    async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, user_id FROM api_tokens WHERE token_hash = ?")
                .bind(hash_token(token))
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let (token_id, user_id) = row.ok_or(AuthError::InvalidToken)?;
        let user_id = Uuid::parse_str(&user_id).map_err(|_| AuthError::InvalidToken)?;

        // Best effort; a failed touch never fails the request.
        let _ = sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(&token_id)
            .execute(&self.pool.writer)
            .await;

        Ok(Identity { user_id })
    }
}

/// Compute SHA-256 hash of a token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::user::SqliteUserStore;
    use samvad_types::connection::PartyRole;

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let user = SqliteUserStore::new(pool.clone())
            .create("9855555555", "Asha", PartyRole::Customer)
            .await
            .unwrap();

        let auth = SqliteTokenAuth::new(pool);
        let token = auth.issue(&user.id).await.unwrap();
        assert!(token.starts_with("smvd_"));

        let identity = auth.resolve_identity(&token).await.unwrap();
        assert_eq!(identity.user_id, user.id);
    }

    #[tokio::test]
    async fn test_bogus_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let auth = SqliteTokenAuth::new(pool);
        let result = auth.resolve_identity("smvd_deadbeef").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let h1 = hash_token("smvd_abc");
        let h2 = hash_token("smvd_abc");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_token("smvd_abd"));
    }
}
