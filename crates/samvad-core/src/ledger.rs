//! Ledger trait definition.
//!
//! The wallet ledger is an external collaborator: it owns customer
//! balances, the session coordinator owns lifecycle state. A debit either
//! fully succeeds or fully fails -- there is no overdraft path, and a
//! failed or unavailable debit ends the session rather than letting it
//! run unbilled.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use samvad_types::error::LedgerError;
use uuid::Uuid;

/// Port to the customer wallet ledger.
///
/// Implementations live in samvad-infra (e.g., `SqliteWalletLedger`).
/// Implementations must serialize debits per customer; the coordinator
/// never issues concurrent debits for one session, but a shared ledger
/// may serve other spenders.
pub trait Ledger: Send + Sync {
    /// Current balance in minor units.
    fn balance(
        &self,
        customer_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<i64, LedgerError>> + Send;

    /// Atomically debit `amount` minor units, returning the remaining
    /// balance. Fails with [`LedgerError::Insufficient`] when the balance
    /// does not cover the amount; the balance is then left untouched.
    fn debit(
        &self,
        customer_id: &Uuid,
        amount: i64,
    ) -> impl std::future::Future<Output = Result<i64, LedgerError>> + Send;
}
