//! Current-user endpoints.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::middleware::{BearerAuth, OptionalBearerAuth};
use crate::storage::UserResponse;

/// Body of `GET /auth/whoami`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhoAmI {
    /// Whether a valid credential was presented.
    pub authenticated: bool,
    /// The user, if authenticated.
    pub user: Option<UserResponse>,
}

/// Handler for `GET /auth/me`.
pub async fn me_handler(BearerAuth(user): BearerAuth) -> Json<UserResponse> {
    Json(user)
}

/// Handler for `GET /auth/whoami`.
pub async fn whoami_handler(OptionalBearerAuth(user): OptionalBearerAuth) -> Json<WhoAmI> {
    Json(WhoAmI {
        authenticated: user.is_some(),
        user,
    })
}
