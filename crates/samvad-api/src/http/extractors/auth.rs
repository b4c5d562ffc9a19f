//! Bearer token authentication extractor.
//!
//! Resolves `Authorization: Bearer <token>` to a party identity through
//! the `Auth` port. Identity is resolved once here and carried explicitly
//! into the handlers -- no ambient token lookup downstream.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use samvad_core::auth::{Auth, Identity};
use samvad_types::error::AuthError;

use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated caller. Extracting this validates the bearer token.
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let identity = state.auth.resolve_identity(&token).await?;
        Ok(AuthUser(identity))
    }
}

/// Extract the bearer token from the Authorization header.
fn extract_bearer_token(parts: &Parts) -> Result<String, AppError> {
    let auth = parts
        .headers
        .get("authorization")
        .ok_or(AppError::Auth(AuthError::InvalidToken))?;
    let auth_str = auth
        .to_str()
        .map_err(|_| AppError::Auth(AuthError::InvalidToken))?;
    auth_str
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .ok_or(AppError::Auth(AuthError::InvalidToken))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header("authorization", v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extracted() {
        let parts = parts_with_header(Some("Bearer smvd_abc "));
        assert_eq!(extract_bearer_token(&parts).unwrap(), "smvd_abc");
    }

    #[test]
    fn test_missing_header_rejected() {
        let parts = parts_with_header(None);
        assert!(extract_bearer_token(&parts).is_err());
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let parts = parts_with_header(Some("Basic dXNlcjpwYXNz"));
        assert!(extract_bearer_token(&parts).is_err());
    }
}
