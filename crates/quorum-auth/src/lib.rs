//! # quorum-auth
//!
//! Bearer authentication for the Quorum decisions backend.
//!
//! This crate provides:
//! - The auth guard: revocation check, token verification, user lookup
//! - Axum extractors for mandatory and optional bearer auth
//! - HMAC JWT issuing and verification
//! - In-memory and Redis revocation lists
//! - Session endpoints (login, refresh, logout, me, whoami)
//!
//! ## Modules
//!
//! - [`guard`] - The authentication pipeline
//! - [`error`] - Error taxonomy and reject reasons
//! - [`config`] - Token and revocation configuration
//! - [`token`] - JWT claims, issuing and verification
//! - [`storage`] - User and revocation storage traits and backends
//! - [`middleware`] - Axum extractors and error responses
//! - [`http`] - Session endpoint handlers

pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod middleware;
pub mod storage;
pub mod token;

pub use config::{AuthConfig, ConfigError, RevocationBackend, RevocationConfig};
pub use error::{AuthError, ErrorCategory, RejectReason};
pub use guard::{AuthGuard, GuardOutcome, VerifiedToken};
pub use http::{SessionState, auth_routes};
pub use middleware::{AuthState, BearerAuth, OptionalBearerAuth};
pub use storage::{
    InMemoryTokenBlacklist, InMemoryUserStorage, RedisTokenBlacklist, TokenBlacklist, User,
    UserResponse, UserStorage,
};
pub use token::{JwtService, TokenDecoder, TokenPair, TokenType};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use quorum_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory, RejectReason};
    pub use crate::guard::{AuthGuard, GuardOutcome};
    pub use crate::middleware::{AuthState, BearerAuth, OptionalBearerAuth};
    pub use crate::storage::{TokenBlacklist, User, UserResponse, UserStorage};
    pub use crate::token::{JwtService, TokenDecoder, TokenType};
}
