//! SQLite-backed infrastructure.
//!
//! All repositories share the split reader/writer [`pool::DatabasePool`].
//! Row mapping follows one pattern throughout: raw queries, private Row
//! structs, TEXT columns parsed into domain types.

pub mod message;
pub mod pool;
pub mod rates;
pub mod session;
pub mod token;
pub mod user;
pub mod wallet;

use chrono::{DateTime, Utc};
use samvad_types::error::RepositoryError;

/// Parse an RFC 3339 TEXT column into a UTC timestamp.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid timestamp '{s}': {e}")))
}

/// Map a sqlx error, surfacing unique-constraint violations as conflicts.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        _ => RepositoryError::Query(err.to_string()),
    }
}
