//! Provider rate catalogue port.
//!
//! Consulted once when a consultation is created; the resolved rate is
//! pinned on the session row and never re-read mid-session.

use samvad_types::error::RepositoryError;
use uuid::Uuid;

/// Port to the provider profile catalogue.
pub trait RateCatalogue: Send + Sync {
    /// Per-minute chat rate for a provider, in minor units.
    fn chat_rate(
        &self,
        provider_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;
}
