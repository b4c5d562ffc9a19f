//! SQLite wallet ledger implementation.
//!
//! Debits are a single conditional UPDATE guarded by the balance check,
//! executed on the single-connection writer pool: per-customer debit
//! serialization and the no-overdraft guarantee both fall out of that.

use samvad_core::ledger::Ledger;
use samvad_types::error::LedgerError;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of the `Ledger` port.
pub struct SqliteWalletLedger {
    pool: DatabasePool,
}

impl SqliteWalletLedger {
    /// Create a new ledger backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Credit a wallet (top-up). Creates the wallet row if absent.
    pub async fn credit(&self, customer_id: &Uuid, amount: i64) -> Result<i64, LedgerError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO wallets (user_id, balance, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET balance = balance + excluded.balance, \
             updated_at = excluded.updated_at",
        )
        .bind(customer_id.to_string())
        .bind(amount)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        self.balance_inner(customer_id).await
    }

    async fn balance_inner(&self, customer_id: &Uuid) -> Result<i64, LedgerError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT balance FROM wallets WHERE user_id = ?")
            .bind(customer_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        row.map(|r| r.0).ok_or(LedgerError::NoWallet)
    }
}

impl Ledger for SqliteWalletLedger {
    async fn balance(&self, customer_id: &Uuid) -> Result<i64, LedgerError> {
        self.balance_inner(customer_id).await
    }

    async fn debit(&self, customer_id: &Uuid, amount: i64) -> Result<i64, LedgerError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE wallets SET balance = balance - ?, updated_at = ? \
             WHERE user_id = ? AND balance >= ?",
        )
        .bind(amount)
        .bind(&now)
        .bind(customer_id.to_string())
        .bind(amount)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if result.rows_affected() == 0 {
            // Distinguish a missing wallet from an underfunded one.
            return match self.balance_inner(customer_id).await {
                Ok(_) => Err(LedgerError::Insufficient),
                Err(err) => Err(err),
            };
        }

        self.balance_inner(customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::user::SqliteUserStore;
    use samvad_types::connection::PartyRole;

    async fn funded_customer(balance: i64) -> (SqliteWalletLedger, Uuid, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let users = SqliteUserStore::new(pool.clone());
        let customer = users
            .create("9833333333", "Kiran", PartyRole::Customer)
            .await
            .unwrap();

        let ledger = SqliteWalletLedger::new(pool);
        if balance > 0 {
            ledger.credit(&customer.id, balance).await.unwrap();
        }
        (ledger, customer.id, dir)
    }

    #[tokio::test]
    async fn test_credit_then_balance() {
        let (ledger, customer_id, _dir) = funded_customer(5000).await;
        assert_eq!(ledger.balance(&customer_id).await.unwrap(), 5000);

        let after = ledger.credit(&customer_id, 1500).await.unwrap();
        assert_eq!(after, 6500);
    }

    #[tokio::test]
    async fn test_debit_reduces_balance() {
        let (ledger, customer_id, _dir) = funded_customer(3000).await;
        let remaining = ledger.debit(&customer_id, 1000).await.unwrap();
        assert_eq!(remaining, 2000);
    }

    #[tokio::test]
    async fn test_debit_never_overdrafts() {
        let (ledger, customer_id, _dir) = funded_customer(999).await;
        let result = ledger.debit(&customer_id, 1000).await;
        assert!(matches!(result, Err(LedgerError::Insufficient)));
        // Balance untouched by the refused debit.
        assert_eq!(ledger.balance(&customer_id).await.unwrap(), 999);
    }

    #[tokio::test]
    async fn test_debit_exact_balance_to_zero() {
        let (ledger, customer_id, _dir) = funded_customer(1000).await;
        assert_eq!(ledger.debit(&customer_id, 1000).await.unwrap(), 0);
        assert!(matches!(
            ledger.debit(&customer_id, 1000).await,
            Err(LedgerError::Insufficient)
        ));
    }

    #[tokio::test]
    async fn test_missing_wallet() {
        let (ledger, _customer_id, _dir) = funded_customer(0).await;
        let stranger = Uuid::now_v7();
        assert!(matches!(
            ledger.balance(&stranger).await,
            Err(LedgerError::NoWallet)
        ));
        assert!(matches!(
            ledger.debit(&stranger, 100).await,
            Err(LedgerError::NoWallet)
        ));
    }
}
