//! Revoked token storage.
//!
//! A revocation record pre-empts a token that would otherwise still be
//! valid, typically after logout or refresh-token rotation. Records are
//! keyed by the SHA-256 fingerprint of the raw token string, so the store
//! never holds usable credentials, and carry the token's natural expiry so
//! they can be dropped once the token would have expired anyway.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{AuthError, AuthResult};

/// Returns the hex SHA-256 digest used as the revocation key for a token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Storage trait for revoked tokens.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Marks a token as revoked until `expires_at`.
    ///
    /// Idempotent: revoking an already revoked token succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn blacklist(&self, token: &str, expires_at: OffsetDateTime) -> AuthResult<()>;

    /// Checks whether a token has been revoked.
    ///
    /// Called on every authenticated request.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_blacklisted(&self, token: &str) -> AuthResult<bool>;

    /// Deletes records whose token has naturally expired.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup fails.
    async fn purge_expired(&self) -> AuthResult<u64>;
}

// =============================================================================
// Redis
// =============================================================================

const REDIS_KEY_PREFIX: &str = "quorum:revoked:";

/// Redis-backed revocation list shared between server instances.
///
/// Each record is a key with a TTL equal to the token's remaining lifetime,
/// so Redis expires records on its own and [`TokenBlacklist::purge_expired`]
/// has nothing to do.
#[derive(Clone)]
pub struct RedisTokenBlacklist {
    redis: ConnectionManager,
}

impl RedisTokenBlacklist {
    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Connects to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> AuthResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AuthError::configuration(format!("invalid redis url: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AuthError::storage(format!("redis connection failed: {e}")))?;
        Ok(Self::new(manager))
    }

    fn key(token: &str) -> String {
        format!("{REDIS_KEY_PREFIX}{}", token_fingerprint(token))
    }
}

#[async_trait]
impl TokenBlacklist for RedisTokenBlacklist {
    async fn blacklist(&self, token: &str, expires_at: OffsetDateTime) -> AuthResult<()> {
        let remaining = (expires_at - OffsetDateTime::now_utc()).whole_seconds();
        if remaining <= 0 {
            // Already expired; signature validation rejects it without help.
            return Ok(());
        }

        let mut conn = self.redis.clone();
        let _: () = redis::cmd("SET")
            .arg(Self::key(token))
            .arg(expires_at.unix_timestamp())
            .arg("EX")
            .arg(remaining)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::storage(format!("failed to record revocation: {e}")))?;

        tracing::debug!(ttl = remaining, "Token added to redis revocation list");
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> AuthResult<bool> {
        let mut conn = self.redis.clone();
        let exists: bool = conn
            .exists(Self::key(token))
            .await
            .map_err(|e| AuthError::storage(format!("failed to check revocation list: {e}")))?;
        Ok(exists)
    }

    async fn purge_expired(&self) -> AuthResult<u64> {
        Ok(0)
    }
}
