//! Logout endpoint.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};

use super::SessionState;
use crate::error::{AuthError, RejectReason};
use crate::middleware::bearer_token;
use crate::token::TokenType;

/// Handler for `POST /auth/logout`.
///
/// Revokes the presented access token until its natural expiry and answers
/// `204 No Content`. The token must itself pass the guard.
pub async fn logout_handler(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<StatusCode, AuthError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AuthError::unauthenticated(RejectReason::MissingCredentials))?;

    let verified = state
        .guard
        .verify(token, &TokenType::Access)
        .await
        .map_err(AuthError::unauthenticated)?;

    state
        .blacklist
        .blacklist(token, verified.claims.expires_at())
        .await?;

    tracing::info!(user_id = %verified.user.id, jti = %verified.claims.jti, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}
