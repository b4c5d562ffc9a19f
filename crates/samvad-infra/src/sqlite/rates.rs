//! SQLite provider rate catalogue.
//!
//! One row per provider with their per-minute chat rate. Consulted once
//! at consultation creation; sessions pin the rate they were opened at.

use samvad_core::catalogue::RateCatalogue;
use samvad_types::error::RepositoryError;
use uuid::Uuid;

use super::map_sqlx_error;
use super::pool::DatabasePool;

/// SQLite-backed implementation of the `RateCatalogue` port.
pub struct SqliteRateCatalogue {
    pool: DatabasePool,
}

impl SqliteRateCatalogue {
    /// Create a new catalogue backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Set (or update) a provider's per-minute chat rate.
    pub async fn set_chat_rate(&self, provider_id: &Uuid, rate: i64) -> Result<(), RepositoryError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO provider_profiles (user_id, chat_rate, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET chat_rate = excluded.chat_rate, \
             updated_at = excluded.updated_at",
        )
        .bind(provider_id.to_string())
        .bind(rate)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

impl RateCatalogue for SqliteRateCatalogue {
    async fn chat_rate(&self, provider_id: &Uuid) -> Result<i64, RepositoryError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT chat_rate FROM provider_profiles WHERE user_id = ?")
                .bind(provider_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(map_sqlx_error)?;
        row.map(|r| r.0).ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::user::SqliteUserStore;
    use samvad_types::connection::PartyRole;

    #[tokio::test]
    async fn test_set_and_read_rate() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let provider = SqliteUserStore::new(pool.clone())
            .create("9844444444", "Guruji", PartyRole::Provider)
            .await
            .unwrap();

        let catalogue = SqliteRateCatalogue::new(pool);
        catalogue.set_chat_rate(&provider.id, 2100).await.unwrap();
        assert_eq!(catalogue.chat_rate(&provider.id).await.unwrap(), 2100);

        // Updating overwrites.
        catalogue.set_chat_rate(&provider.id, 2500).await.unwrap();
        assert_eq!(catalogue.chat_rate(&provider.id).await.unwrap(), 2500);
    }

    #[tokio::test]
    async fn test_unknown_provider_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let catalogue = SqliteRateCatalogue::new(pool);
        let result = catalogue.chat_rate(&Uuid::now_v7()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }
}
