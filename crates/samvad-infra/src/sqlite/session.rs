//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `samvad-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, TEXT columns
//! parsed into domain types.

use samvad_core::repository::SessionRepository;
use samvad_types::error::RepositoryError;
use samvad_types::session::{ConsultationKind, ConsultationSession, EndReason, SessionStatus};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{map_sqlx_error, parse_datetime};

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain ConsultationSession.
struct SessionRow {
    id: String,
    customer_id: String,
    provider_id: String,
    kind: String,
    rate_per_minute: i64,
    status: String,
    started_at: Option<String>,
    ended_at: Option<String>,
    billed_seconds: i64,
    end_reason: Option<String>,
    created_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            provider_id: row.try_get("provider_id")?,
            kind: row.try_get("kind")?,
            rate_per_minute: row.try_get("rate_per_minute")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            billed_seconds: row.try_get("billed_seconds")?,
            end_reason: row.try_get("end_reason")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_session(self) -> Result<ConsultationSession, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let customer_id = Uuid::parse_str(&self.customer_id)
            .map_err(|e| RepositoryError::Query(format!("invalid customer_id: {e}")))?;
        let provider_id = Uuid::parse_str(&self.provider_id)
            .map_err(|e| RepositoryError::Query(format!("invalid provider_id: {e}")))?;
        let kind: ConsultationKind = self
            .kind
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let status: SessionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let end_reason: Option<EndReason> = self
            .end_reason
            .as_deref()
            .map(|r| r.parse().map_err(|e: String| RepositoryError::Query(e)))
            .transpose()?;
        let started_at = self.started_at.as_deref().map(parse_datetime).transpose()?;
        let ended_at = self.ended_at.as_deref().map(parse_datetime).transpose()?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ConsultationSession {
            id,
            customer_id,
            provider_id,
            kind,
            rate_per_minute: self.rate_per_minute,
            status,
            started_at,
            ended_at,
            billed_seconds: self.billed_seconds as u64,
            end_reason,
            created_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, customer_id, provider_id, kind, rate_per_minute, status, \
     started_at, ended_at, billed_seconds, end_reason, created_at";

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &ConsultationSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (id, customer_id, provider_id, kind, rate_per_minute, status, \
             started_at, ended_at, billed_seconds, end_reason, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(session.customer_id.to_string())
        .bind(session.provider_id.to_string())
        .bind(session.kind.to_string())
        .bind(session.rate_per_minute)
        .bind(session.status.to_string())
        .bind(session.started_at.map(|t| t.to_rfc3339()))
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.billed_seconds as i64)
        .bind(session.end_reason.map(|r| r.to_string()))
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get(&self, session_id: &Uuid) -> Result<Option<ConsultationSession>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(session_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| {
            SessionRow::from_row(&r)
                .map_err(map_sqlx_error)
                .and_then(SessionRow::into_session)
        })
        .transpose()
    }

    async fn update(&self, session: &ConsultationSession) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE sessions SET status = ?, started_at = ?, ended_at = ?, \
             billed_seconds = ?, end_reason = ? WHERE id = ?",
        )
        .bind(session.status.to_string())
        .bind(session.started_at.map(|t| t.to_rfc3339()))
        .bind(session.ended_at.map(|t| t.to_rfc3339()))
        .bind(session.billed_seconds as i64)
        .bind(session.end_reason.map(|r| r.to_string()))
        .bind(session.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConsultationSession>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sessions \
             WHERE customer_id = ? OR provider_id = ? \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|r| {
                SessionRow::from_row(r)
                    .map_err(map_sqlx_error)
                    .and_then(SessionRow::into_session)
            })
            .collect()
    }

    async fn find_live_for_customer(
        &self,
        customer_id: &Uuid,
    ) -> Result<Option<ConsultationSession>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sessions \
             WHERE customer_id = ? AND status IN ('active', 'paused') LIMIT 1"
        ))
        .bind(customer_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| {
            SessionRow::from_row(&r)
                .map_err(map_sqlx_error)
                .and_then(SessionRow::into_session)
        })
        .transpose()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.0 as u64)
    }
}
