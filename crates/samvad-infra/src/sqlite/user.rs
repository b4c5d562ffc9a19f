//! Minimal user store: phone-number identified marketplace accounts.
//!
//! The session subsystem only needs party ids; this store exists for the
//! admin CLI and for the REST layer to validate that a provider exists
//! before opening a consultation against them.

use chrono::{DateTime, Utc};
use samvad_types::connection::PartyRole;
use samvad_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{map_sqlx_error, parse_datetime};

/// A marketplace account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub display_name: String,
    pub role: PartyRole,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed user store.
pub struct SqliteUserStore {
    pool: DatabasePool,
}

impl SqliteUserStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a user. Phone numbers are normalized to digits with a
    /// default country code, mirroring how the marketplace registers
    /// accounts.
    pub async fn create(
        &self,
        phone_number: &str,
        display_name: &str,
        role: PartyRole,
    ) -> Result<User, RepositoryError> {
        let user = User {
            id: Uuid::now_v7(),
            phone_number: normalize_phone(phone_number),
            display_name: display_name.to_string(),
            role,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, phone_number, display_name, role, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.phone_number)
        .bind(&user.display_name)
        .bind(user.role.to_string())
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user)
    }

    /// Get a user by id.
    pub async fn get(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, phone_number, display_name, role, created_at FROM users WHERE id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| user_from_row(&r)).transpose()
    }

    /// Count all users.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.0 as u64)
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;
    let phone_number: String = row.try_get("phone_number").map_err(map_sqlx_error)?;
    let display_name: String = row.try_get("display_name").map_err(map_sqlx_error)?;
    let role: String = row.try_get("role").map_err(map_sqlx_error)?;
    let created_at: String = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(User {
        id: Uuid::parse_str(&id)
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?,
        phone_number,
        display_name,
        role: role.parse().map_err(|e: String| RepositoryError::Query(e))?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Strip non-digits and default to the Indian country code for bare
/// 10-digit numbers.
fn normalize_phone(phone_number: &str) -> String {
    let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("91{digits}")
    } else {
        digits
    }
}
