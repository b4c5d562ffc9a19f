//! Identity resolution port.
//!
//! Identity is resolved exactly once, at connection-attach time (or per
//! REST request), and carried as an explicit value through all subsequent
//! operations -- there is no ambient token lookup anywhere downstream.

use samvad_types::error::AuthError;
use uuid::Uuid;

/// A resolved party identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

/// Port to the token-issuing auth collaborator.
pub trait Auth: Send + Sync {
    /// Resolve an opaque bearer token to a party identity.
    fn resolve_identity(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, AuthError>> + Send;
}
