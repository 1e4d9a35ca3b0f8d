//! The bearer authentication guard.
//!
//! [`AuthGuard`] turns a bearer credential into a [`UserResponse`]. The
//! pipeline runs in a fixed order and stops at the first failing step:
//!
//! 1. no credential presented
//! 2. token is on the revocation list
//! 3. signature, structure or expiry check fails
//! 4. token was not issued as an access token
//! 5. subject does not name a known user
//! 6. user account is disabled
//!
//! Both entry points, [`AuthGuard::authenticate`] and
//! [`AuthGuard::authenticate_optional`], are thin adapters over
//! [`AuthGuard::resolve`], which returns a [`GuardOutcome`].
//!
//! The guard fails closed. Storage errors and panics inside the pipeline
//! surface as [`RejectReason::Internal`], never as an identity.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use uuid::Uuid;

use crate::error::{AuthError, RejectReason};
use crate::storage::{TokenBlacklist, UserResponse, UserStorage};
use crate::token::{JwtError, TokenClaims, TokenDecoder, TokenType};

/// Result of running the guard pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Every check passed.
    Authenticated(UserResponse),
    /// No credential was presented.
    Anonymous,
    /// A credential was presented and refused.
    Rejected(RejectReason),
}

impl GuardOutcome {
    /// Returns the user if authenticated.
    #[must_use]
    pub fn user(&self) -> Option<&UserResponse> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// A token that passed every check, with its claims.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Owner of the token.
    pub user: UserResponse,
    /// Decoded claims.
    pub claims: TokenClaims,
}

/// Validates bearer credentials against its collaborators.
///
/// Holds no mutable state of its own; share it behind an `Arc`.
#[derive(Clone)]
pub struct AuthGuard {
    decoder: Arc<dyn TokenDecoder>,
    blacklist: Arc<dyn TokenBlacklist>,
    users: Arc<dyn UserStorage>,
}

impl AuthGuard {
    /// Creates a guard over the given collaborators.
    pub fn new(
        decoder: Arc<dyn TokenDecoder>,
        blacklist: Arc<dyn TokenBlacklist>,
        users: Arc<dyn UserStorage>,
    ) -> Self {
        Self {
            decoder,
            blacklist,
            users,
        }
    }

    /// Mandatory authentication.
    ///
    /// # Errors
    /// Returns [`AuthError::Unauthenticated`] when no credential is presented
    /// or any check fails.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<UserResponse, AuthError> {
        match self.resolve(credential).await {
            GuardOutcome::Authenticated(user) => Ok(user),
            GuardOutcome::Anonymous => Err(AuthError::unauthenticated(
                RejectReason::MissingCredentials,
            )),
            GuardOutcome::Rejected(reason) => Err(AuthError::unauthenticated(reason)),
        }
    }

    /// Optional authentication.
    ///
    /// Returns `None` when no credential is presented and also when a
    /// presented credential is refused.
    pub async fn authenticate_optional(&self, credential: Option<&str>) -> Option<UserResponse> {
        match self.resolve(credential).await {
            GuardOutcome::Authenticated(user) => Some(user),
            GuardOutcome::Anonymous | GuardOutcome::Rejected(_) => None,
        }
    }

    /// Runs the pipeline and reports the outcome.
    ///
    /// An empty credential counts as no credential.
    pub async fn resolve(&self, credential: Option<&str>) -> GuardOutcome {
        let Some(token) = credential.filter(|t| !t.is_empty()) else {
            tracing::debug!(reason = %RejectReason::MissingCredentials, "No bearer credential");
            return GuardOutcome::Anonymous;
        };

        match self.verify(token, &TokenType::Access).await {
            Ok(verified) => {
                tracing::debug!(user_id = %verified.user.id, "Bearer token accepted");
                GuardOutcome::Authenticated(verified.user)
            }
            Err(reason) => GuardOutcome::Rejected(reason),
        }
    }

    /// Runs steps 2 to 6 for a token of the expected type.
    ///
    /// Used directly by endpoints that need the claims, such as logout
    /// (expiry) and refresh (which expects [`TokenType::Refresh`]).
    ///
    /// # Errors
    /// Returns the reason of the first failing check.
    pub async fn verify(
        &self,
        token: &str,
        expected: &TokenType,
    ) -> Result<VerifiedToken, RejectReason> {
        let result = AssertUnwindSafe(self.run_checks(token, expected))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!("Auth pipeline panicked");
                Err(RejectReason::Internal)
            });

        if let Err(reason) = &result {
            match reason {
                RejectReason::Internal => {
                    tracing::warn!(reason = %reason, "Bearer token rejected, failing closed");
                }
                _ => tracing::debug!(reason = %reason, "Bearer token rejected"),
            }
        }
        result
    }

    async fn run_checks(
        &self,
        token: &str,
        expected: &TokenType,
    ) -> Result<VerifiedToken, RejectReason> {
        match self.blacklist.is_blacklisted(token).await {
            Ok(false) => {}
            Ok(true) => return Err(RejectReason::Revoked),
            Err(e) => {
                tracing::warn!(error = %e, "Revocation lookup failed");
                return Err(RejectReason::Internal);
            }
        }

        let claims = self.decoder.decode(token).map_err(|e| match e {
            JwtError::Expired => RejectReason::Expired,
            other => {
                tracing::trace!(error = %other, "Token verification failed");
                RejectReason::InvalidCredentials
            }
        })?;

        if !self.decoder.verify_type(&claims, expected) {
            tracing::debug!(
                token_type = %claims.token_type,
                expected = %expected,
                "Unexpected token type"
            );
            return Err(RejectReason::WrongTokenType);
        }

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Err(RejectReason::UserNotFound);
        };

        let user = match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(RejectReason::UserNotFound),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "User lookup failed");
                return Err(RejectReason::Internal);
            }
        };

        if !user.is_active() {
            tracing::warn!(user_id = %user_id, "Inactive user presented a valid token");
            return Err(RejectReason::InactiveAccount);
        }

        Ok(VerifiedToken {
            user: user.to_response(),
            claims,
        })
    }
}

impl std::fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthResult;
    use crate::storage::{InMemoryTokenBlacklist, InMemoryUserStorage, User};
    use crate::token::{HmacAlgorithm, JwtService, SigningKey};
    use async_trait::async_trait;
    use std::time::Duration;
    use time::OffsetDateTime;

    const SECRET: &[u8] = b"guard-test-secret-long-enough-for-hmac";

    struct Fixture {
        jwt: Arc<JwtService>,
        blacklist: Arc<InMemoryTokenBlacklist>,
        users: Arc<InMemoryUserStorage>,
        guard: AuthGuard,
    }

    fn fixture() -> Fixture {
        let key = SigningKey::new(HmacAlgorithm::HS256, SECRET).unwrap();
        let jwt = Arc::new(JwtService::new(key, "quorum").with_leeway(Duration::ZERO));
        let blacklist = Arc::new(InMemoryTokenBlacklist::new());
        let users = Arc::new(InMemoryUserStorage::new());
        let guard = AuthGuard::new(jwt.clone(), blacklist.clone(), users.clone());
        Fixture {
            jwt,
            blacklist,
            users,
            guard,
        }
    }

    async fn add_user(fx: &Fixture, active: bool) -> User {
        let user = User::builder(format!("user-{}", Uuid::new_v4()), "u@example.com")
            .active(active)
            .build()
            .unwrap();
        fx.users.create(&user).await.unwrap();
        user
    }

    fn reason(result: Result<UserResponse, AuthError>) -> RejectReason {
        result.unwrap_err().reject_reason().unwrap()
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let fx = fixture();

        assert_eq!(fx.guard.resolve(None).await, GuardOutcome::Anonymous);
        assert_eq!(fx.guard.resolve(Some("")).await, GuardOutcome::Anonymous);
        assert_eq!(
            reason(fx.guard.authenticate(None).await),
            RejectReason::MissingCredentials
        );
        assert!(fx.guard.authenticate_optional(None).await.is_none());
    }

    #[tokio::test]
    async fn test_valid_token_yields_subject() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let token = fx.jwt.issue_access(user.id).unwrap();

        let identity = fx.guard.authenticate(Some(&token)).await.unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.username, user.username);

        let optional = fx.guard.authenticate_optional(Some(&token)).await;
        assert_eq!(optional, Some(identity));
    }

    #[tokio::test]
    async fn test_revoked_token_rejected() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let token = fx.jwt.issue_access(user.id).unwrap();
        fx.blacklist
            .blacklist(&token, OffsetDateTime::now_utc() + time::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::Revoked
        );
    }

    #[tokio::test]
    async fn test_revocation_checked_before_expiry() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let claims = TokenClaims::builder("quorum", user.id.to_string(), TokenType::Access)
            .expires_in_seconds(-300)
            .build();
        let token = fx.jwt.encode(&claims).unwrap();

        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::Expired
        );

        fx.blacklist
            .blacklist(&token, OffsetDateTime::now_utc() + time::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::Revoked
        );
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let fx = fixture();
        assert_eq!(
            reason(fx.guard.authenticate(Some("not.a.jwt")).await),
            RejectReason::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_access() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let refresh = fx.jwt.issue_refresh(user.id).unwrap();

        assert_eq!(
            reason(fx.guard.authenticate(Some(&refresh)).await),
            RejectReason::WrongTokenType
        );
        assert!(fx.guard.verify(&refresh, &TokenType::Refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let fx = fixture();
        let token = fx.jwt.issue_access(Uuid::new_v4()).unwrap();
        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::UserNotFound
        );

        let claims = TokenClaims::builder("quorum", "not-a-uuid", TokenType::Access).build();
        let token = fx.jwt.encode(&claims).unwrap();
        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::UserNotFound
        );
    }

    #[tokio::test]
    async fn test_inactive_user_rejected() {
        let fx = fixture();
        let user = add_user(&fx, false).await;
        let token = fx.jwt.issue_access(user.id).unwrap();

        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::InactiveAccount
        );
    }

    #[tokio::test]
    async fn test_optional_mode_swallows_rejections() {
        let fx = fixture();
        let user = add_user(&fx, false).await;
        let token = fx.jwt.issue_access(user.id).unwrap();

        assert_eq!(
            fx.guard.resolve(Some(&token)).await,
            GuardOutcome::Rejected(RejectReason::InactiveAccount)
        );
        assert!(fx.guard.authenticate_optional(Some(&token)).await.is_none());
        assert!(fx.guard.authenticate_optional(Some("garbage")).await.is_none());
    }

    #[tokio::test]
    async fn test_repeat_calls_and_later_revocation() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let token = fx.jwt.issue_access(user.id).unwrap();

        let first = fx.guard.resolve(Some(&token)).await;
        let second = fx.guard.resolve(Some(&token)).await;
        assert_eq!(first, second);
        assert!(first.user().is_some());

        fx.blacklist
            .blacklist(&token, OffsetDateTime::now_utc() + time::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(
            fx.guard.resolve(Some(&token)).await,
            GuardOutcome::Rejected(RejectReason::Revoked)
        );
    }

    #[tokio::test]
    async fn test_far_future_token_stays_revoked_after_purge() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let claims = TokenClaims::builder("quorum", user.id.to_string(), TokenType::Access)
            .expires_in_seconds(20_000 * 365 * 24 * 3600)
            .build();
        let token = fx.jwt.encode(&claims).unwrap();

        let verified = fx.guard.verify(&token, &TokenType::Access).await.unwrap();
        fx.blacklist
            .blacklist(&token, verified.claims.expires_at())
            .await
            .unwrap();
        assert_eq!(fx.blacklist.purge_expired().await.unwrap(), 0);

        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::Revoked
        );
    }

    #[tokio::test]
    async fn test_deactivation_applies_to_live_tokens() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let token = fx.jwt.issue_access(user.id).unwrap();
        assert!(fx.guard.authenticate(Some(&token)).await.is_ok());

        fx.users.set_active(user.id, false).await.unwrap();
        assert_eq!(
            reason(fx.guard.authenticate(Some(&token)).await),
            RejectReason::InactiveAccount
        );
    }

    struct FailingBlacklist;

    #[async_trait]
    impl TokenBlacklist for FailingBlacklist {
        async fn blacklist(&self, _: &str, _: OffsetDateTime) -> AuthResult<()> {
            Err(AuthError::storage("down"))
        }
        async fn is_blacklisted(&self, _: &str) -> AuthResult<bool> {
            Err(AuthError::storage("down"))
        }
        async fn purge_expired(&self) -> AuthResult<u64> {
            Err(AuthError::storage("down"))
        }
    }

    struct PanickingUsers;

    #[async_trait]
    impl UserStorage for PanickingUsers {
        async fn find_by_id(&self, _: Uuid) -> AuthResult<Option<User>> {
            panic!("user store exploded");
        }
        async fn find_by_username(&self, _: &str) -> AuthResult<Option<User>> {
            Ok(None)
        }
        async fn create(&self, _: &User) -> AuthResult<()> {
            Ok(())
        }
        async fn set_active(&self, _: Uuid, _: bool) -> AuthResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_revocation_store_failure_fails_closed() {
        let fx = fixture();
        let user = add_user(&fx, true).await;
        let token = fx.jwt.issue_access(user.id).unwrap();
        let guard = AuthGuard::new(fx.jwt.clone(), Arc::new(FailingBlacklist), fx.users.clone());

        assert_eq!(
            reason(guard.authenticate(Some(&token)).await),
            RejectReason::Internal
        );
        assert!(guard.authenticate_optional(Some(&token)).await.is_none());
    }

    #[tokio::test]
    async fn test_panic_fails_closed() {
        let fx = fixture();
        let token = fx.jwt.issue_access(Uuid::new_v4()).unwrap();
        let guard = AuthGuard::new(fx.jwt.clone(), fx.blacklist.clone(), Arc::new(PanickingUsers));

        assert_eq!(
            reason(guard.authenticate(Some(&token)).await),
            RejectReason::Internal
        );
    }
}
