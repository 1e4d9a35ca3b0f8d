//! Bearer token authentication extractors.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use quorum_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(user): BearerAuth) -> String {
//!     format!("Hello, {}!", user.username)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::guard::AuthGuard;
use crate::storage::UserResponse;

// =============================================================================
// Auth State
// =============================================================================

/// State required by the bearer extractors.
///
/// Include it in the application state and expose it via `FromRef`:
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthState {
    /// The guard every extractor delegates to.
    pub guard: Arc<AuthGuard>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(guard: Arc<AuthGuard>) -> Self {
        Self { guard }
    }
}

// =============================================================================
// Header parsing
// =============================================================================

/// Extracts the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively. A missing header, another
/// scheme, a non-ASCII value or an empty token all yield `None`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Mandatory bearer authentication.
///
/// Rejects with [`AuthError::Unauthenticated`], which renders as a 401 with
/// `WWW-Authenticate: Bearer`.
///
/// ```ignore
/// async fn handler(BearerAuth(user): BearerAuth) -> impl IntoResponse {
///     Json(user)
/// }
/// ```
pub struct BearerAuth(pub UserResponse);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let user = auth_state
            .guard
            .authenticate(bearer_token(&parts.headers))
            .await?;
        Ok(BearerAuth(user))
    }
}

// =============================================================================
// Optional Bearer Auth Extractor
// =============================================================================

/// Optional bearer authentication.
///
/// Never rejects: a missing or refused credential both yield `None`.
///
/// ```ignore
/// async fn handler(OptionalBearerAuth(user): OptionalBearerAuth) -> String {
///     match user {
///         Some(user) => format!("Hello, {}!", user.username),
///         None => "Hello, anonymous!".to_string(),
///     }
/// }
/// ```
pub struct OptionalBearerAuth(pub Option<UserResponse>);

impl<S> FromRequestParts<S> for OptionalBearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let user = auth_state
            .guard
            .authenticate_optional(bearer_token(&parts.headers))
            .await;
        Ok(OptionalBearerAuth(user))
    }
}

// =============================================================================
// Tests
// =============================================================================
