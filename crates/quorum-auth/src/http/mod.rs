//! HTTP handlers for session endpoints.
//!
//! # Available Handlers
//!
//! - [`login_handler`] - `POST /auth/login`, password login
//! - [`refresh_handler`] - `POST /auth/refresh`, refresh-token rotation
//! - [`logout_handler`] - `POST /auth/logout`, revokes the presented token
//! - [`me_handler`] - `GET /auth/me`, current user (mandatory auth)
//! - [`whoami_handler`] - `GET /auth/whoami`, current user if any (optional auth)

pub mod login;
pub mod logout;
pub mod me;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};

use crate::guard::AuthGuard;
use crate::middleware::AuthState;
use crate::storage::{TokenBlacklist, UserStorage};
use crate::token::JwtService;

pub use login::{LoginRequest, RefreshRequest, login_handler, refresh_handler};
pub use logout::logout_handler;
pub use me::{WhoAmI, me_handler, whoami_handler};

/// State shared by the session endpoints.
#[derive(Clone)]
pub struct SessionState {
    /// Guard used to verify presented tokens.
    pub guard: Arc<AuthGuard>,
    /// Issues new token pairs.
    pub jwt_service: Arc<JwtService>,
    /// Receives revoked tokens.
    pub blacklist: Arc<dyn TokenBlacklist>,
    /// Looks up users at login.
    pub users: Arc<dyn UserStorage>,
}

impl SessionState {
    /// Wires the guard and the session endpoints to the same collaborators.
    pub fn new(
        jwt_service: Arc<JwtService>,
        blacklist: Arc<dyn TokenBlacklist>,
        users: Arc<dyn UserStorage>,
    ) -> Self {
        let guard = Arc::new(AuthGuard::new(
            jwt_service.clone(),
            blacklist.clone(),
            users.clone(),
        ));
        Self {
            guard,
            jwt_service,
            blacklist,
            users,
        }
    }
}

impl FromRef<SessionState> for AuthState {
    fn from_ref(state: &SessionState) -> Self {
        AuthState::new(state.guard.clone())
    }
}

/// Routes for the session endpoints, mounted under `/auth` by the caller.
///
/// The returned router has its state applied and can be nested into a
/// router with any state type.
pub fn auth_routes<S>(state: SessionState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_handler))
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler))
        .route("/whoami", get(whoami_handler))
        .with_state(state)
}
