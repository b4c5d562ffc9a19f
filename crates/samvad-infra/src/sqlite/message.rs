//! SQLite message store implementation.
//!
//! Append-only: rows are inserted once and never updated or deleted. The
//! unique (session_id, idempotency_token) index is the durable half of
//! the sequencer's dedup guarantee -- a retried token surfaces as a
//! `Conflict`, which the session actor resolves to the original sequence.

use samvad_core::repository::MessageRepository;
use samvad_types::connection::PartyRole;
use samvad_types::error::RepositoryError;
use samvad_types::message::ChatMessage;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{map_sqlx_error, parse_datetime};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMessage.
struct MessageRow {
    session_id: String,
    seq: i64,
    sender_role: String,
    body: String,
    idempotency_token: String,
    received_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            seq: row.try_get("seq")?,
            sender_role: row.try_get("sender_role")?,
            body: row.try_get("body")?,
            idempotency_token: row.try_get("idempotency_token")?,
            received_at: row.try_get("received_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let sender_role: PartyRole = self
            .sender_role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let received_at = parse_datetime(&self.received_at)?;

        Ok(ChatMessage {
            session_id,
            seq: self.seq as u64,
            sender_role,
            body: self.body,
            idempotency_token: self.idempotency_token,
            received_at,
        })
    }
}

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO messages (session_id, seq, sender_role, body, idempotency_token, received_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.session_id.to_string())
        .bind(message.seq as i64)
        .bind(message.sender_role.to_string())
        .bind(&message.body)
        .bind(&message.idempotency_token)
        .bind(message.received_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_token(
        &self,
        session_id: &Uuid,
        idempotency_token: &str,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query(
            "SELECT session_id, seq, sender_role, body, idempotency_token, received_at \
             FROM messages WHERE session_id = ? AND idempotency_token = ?",
        )
        .bind(session_id.to_string())
        .bind(idempotency_token)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| {
            MessageRow::from_row(&r)
                .map_err(map_sqlx_error)
                .and_then(MessageRow::into_message)
        })
        .transpose()
    }

    async fn list(
        &self,
        session_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT session_id, seq, sender_role, body, idempotency_token, received_at \
             FROM messages WHERE session_id = ? ORDER BY seq ASC LIMIT ? OFFSET ?",
        )
        .bind(session_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|r| {
                MessageRow::from_row(r)
                    .map_err(map_sqlx_error)
                    .and_then(MessageRow::into_message)
            })
            .collect()
    }

    async fn count(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.0 as u64)
    }

    async fn max_seq(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(seq) FROM messages WHERE session_id = ?")
                .bind(session_id.to_string())
                .fetch_one(&self.pool.reader)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.0.unwrap_or(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::session::SqliteSessionRepository;
    use crate::sqlite::user::SqliteUserStore;
    use chrono::Utc;
    use samvad_core::repository::SessionRepository;
    use samvad_types::session::ConsultationSession;

    async fn seeded_session() -> (DatabasePool, tempfile::TempDir, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let users = SqliteUserStore::new(pool.clone());
        let customer = users
            .create("9811111111", "Meera", PartyRole::Customer)
            .await
            .unwrap();
        let provider = users
            .create("9822222222", "Acharya Dev", PartyRole::Provider)
            .await
            .unwrap();

        let session = ConsultationSession::new(customer.id, provider.id, 1200);
        SqliteSessionRepository::new(pool.clone())
            .create(&session)
            .await
            .unwrap();

        (pool, dir, session.id)
    }

    fn message(session_id: Uuid, seq: u64, token: &str) -> ChatMessage {
        ChatMessage {
            session_id,
            seq,
            sender_role: PartyRole::Customer,
            body: format!("message {seq}"),
            idempotency_token: token.to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_and_list_in_seq_order() {
        let (pool, _dir, session_id) = seeded_session().await;
        let repo = SqliteMessageRepository::new(pool);

        for seq in 1..=3 {
            repo.append(&message(session_id, seq, &format!("tok-{seq}")))
                .await
                .unwrap();
        }

        let listed = repo.list(&session_id, 100, 0).await.unwrap();
        let seqs: Vec<u64> = listed.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(repo.count(&session_id).await.unwrap(), 3);
        assert_eq!(repo.max_seq(&session_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_token_is_conflict() {
        let (pool, _dir, session_id) = seeded_session().await;
        let repo = SqliteMessageRepository::new(pool);

        repo.append(&message(session_id, 1, "a1")).await.unwrap();
        let result = repo.append(&message(session_id, 2, "a1")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));

        // The original remains findable by token.
        let found = repo.find_by_token(&session_id, "a1").await.unwrap().unwrap();
        assert_eq!(found.seq, 1);
    }

    #[tokio::test]
    async fn test_duplicate_seq_is_conflict() {
        let (pool, _dir, session_id) = seeded_session().await;
        let repo = SqliteMessageRepository::new(pool);

        repo.append(&message(session_id, 1, "a1")).await.unwrap();
        let result = repo.append(&message(session_id, 1, "a2")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_max_seq_empty_session_is_zero() {
        let (pool, _dir, session_id) = seeded_session().await;
        let repo = SqliteMessageRepository::new(pool);
        assert_eq!(repo.max_seq(&session_id).await.unwrap(), 0);
        assert!(repo.find_by_token(&session_id, "nope").await.unwrap().is_none());
    }
}
