//! HTTP extractors and error responses for bearer authentication.
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
//! let auth_state = AuthState::new(Arc::new(AuthGuard::new(jwt, blacklist, users)));
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth, OptionalBearerAuth, bearer_token};
pub use error::{UNAUTHENTICATED_DETAIL, WWW_AUTHENTICATE_VALUE};
