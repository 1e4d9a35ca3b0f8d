//! In-process storage backed by `DashMap`.
//!
//! Used for development, single-instance deployments and tests. Nothing
//! survives a restart.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

use super::revoked_token::{TokenBlacklist, token_fingerprint};
use super::user::{User, UserStorage};
use crate::{AuthError, AuthResult};

// =============================================================================
// Revocation list
// =============================================================================

/// Revocation list held in memory.
///
/// Keys are token fingerprints; values are the token's natural expiry.
#[derive(Debug, Default)]
pub struct InMemoryTokenBlacklist {
    entries: DashMap<String, OffsetDateTime>,
}

impl InMemoryTokenBlacklist {
    /// Creates an empty revocation list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryTokenBlacklist {
    async fn blacklist(&self, token: &str, expires_at: OffsetDateTime) -> AuthResult<()> {
        let fingerprint = token_fingerprint(token);
        self.entries
            .entry(fingerprint)
            .and_modify(|existing| {
                if expires_at > *existing {
                    *existing = expires_at;
                }
            })
            .or_insert(expires_at);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> AuthResult<bool> {
        // Expired records still match until purged.
        Ok(self.entries.contains_key(&token_fingerprint(token)))
    }

    async fn purge_expired(&self) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        Ok(removed as u64)
    }
}

// =============================================================================
// Users
// =============================================================================

/// User store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryUserStorage {
    users: DashMap<Uuid, User>,
    usernames: DashMap<String, Uuid>,
}

impl InMemoryUserStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn find_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let Some(id) = self.usernames.get(username).map(|r| *r.value()) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        if self.users.contains_key(&user.id) {
            return Err(AuthError::invalid_request(format!(
                "user {} already exists",
                user.id
            )));
        }
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::invalid_request(format!(
                "username '{}' is taken",
                user.username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(())
            }
        }
    }

    async fn set_active(&self, user_id: Uuid, active: bool) -> AuthResult<bool> {
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.is_active = active;
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
