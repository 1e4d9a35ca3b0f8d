//! Password login and refresh-token rotation.

use std::sync::LazyLock;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use super::SessionState;
use crate::error::AuthError;
use crate::storage::{User, hash_password, verify_password};
use crate::token::{TokenPair, TokenType};

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// A refresh token previously issued by login or refresh.
    pub refresh_token: String,
}

/// Handler for `POST /auth/login`.
///
/// Unknown users, wrong passwords and disabled accounts all answer
/// [`AuthError::InvalidLogin`].
pub async fn login_handler(
    State(state): State<SessionState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let Json(request) = body.map_err(|e| AuthError::invalid_request(e.body_text()))?;

    let user = state.users.find_by_username(&request.username).await?;
    let matches = password_matches(user.as_ref(), request.password).await?;

    let Some(user) = user else {
        tracing::info!(username = %request.username, "Login failed: unknown user");
        return Err(AuthError::InvalidLogin);
    };

    if !matches {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(AuthError::InvalidLogin);
    }

    if !user.is_active() {
        tracing::info!(user_id = %user.id, "Login failed: account disabled");
        return Err(AuthError::InvalidLogin);
    }

    let pair = state
        .jwt_service
        .issue_pair(user.id)
        .map_err(|e| AuthError::internal(format!("failed to issue tokens: {e}")))?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(pair))
}

/// Handler for `POST /auth/refresh`.
///
/// The presented refresh token goes through the same checks as an access
/// token (with the refresh purpose) and is revoked before the new pair is
/// issued, so it cannot be replayed.
pub async fn refresh_handler(
    State(state): State<SessionState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let Json(request) = body.map_err(|e| AuthError::invalid_request(e.body_text()))?;

    let verified = state
        .guard
        .verify(&request.refresh_token, &TokenType::Refresh)
        .await
        .map_err(AuthError::unauthenticated)?;

    state
        .blacklist
        .blacklist(&request.refresh_token, verified.claims.expires_at())
        .await?;

    let pair = state
        .jwt_service
        .issue_pair(verified.user.id)
        .map_err(|e| AuthError::internal(format!("failed to issue tokens: {e}")))?;

    tracing::info!(user_id = %verified.user.id, "Refresh token rotated");
    Ok(Json(pair))
}

/// Hash checked when there is no real one, so unknown usernames cost the
/// same argon2 work as wrong passwords.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("quorum-login-dummy-password").ok());

// Argon2 verification is CPU-bound; keep it off the async workers.
async fn password_matches(user: Option<&User>, password: String) -> Result<bool, AuthError> {
    let hash = user.and_then(|u| u.password_hash.clone());
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash).unwrap_or(false),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(&password, dummy);
            }
            false
        }
    })
    .await
    .map_err(|e| AuthError::internal(format!("password check failed: {e}")))
}
