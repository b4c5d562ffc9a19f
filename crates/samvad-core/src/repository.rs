//! Repository trait definitions for durable session and message storage.
//!
//! Implementations live in samvad-infra (e.g., `SqliteSessionRepository`).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use samvad_types::error::RepositoryError;
use samvad_types::message::ChatMessage;
use samvad_types::session::ConsultationSession;
use uuid::Uuid;

/// Repository trait for consultation session persistence.
pub trait SessionRepository: Send + Sync {
    /// Persist a newly created session.
    fn create(
        &self,
        session: &ConsultationSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a session by its unique ID.
    fn get(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ConsultationSession>, RepositoryError>> + Send;

    /// Update an existing session (status, billed_seconds, timestamps).
    fn update(
        &self,
        session: &ConsultationSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List sessions where the user is customer or provider, newest first.
    fn list_for_user(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ConsultationSession>, RepositoryError>> + Send;

    /// Find a customer's live (`active` or `paused`) session, if any.
    /// Backs the one-live-session-per-customer policy across restarts.
    fn find_live_for_customer(
        &self,
        customer_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ConsultationSession>, RepositoryError>> + Send;

    /// Count all sessions.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Repository trait for the append-only chat message store.
///
/// The store is write-ahead with respect to fan-out: a message is
/// persisted before any observer sees it, so an acknowledged message can
/// never be lost.
pub trait MessageRepository: Send + Sync {
    /// Append a sequenced message. Fails with
    /// [`RepositoryError::Conflict`] if the (session, idempotency token)
    /// or (session, seq) pair already exists.
    fn append(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Look up the message previously sequenced for an idempotency token.
    fn find_by_token(
        &self,
        session_id: &Uuid,
        idempotency_token: &str,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// Messages of a session ordered by seq ASC.
    fn list(
        &self,
        session_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Number of messages in a session.
    fn count(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Highest sequence number assigned in a session (0 if none).
    fn max_seq(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
