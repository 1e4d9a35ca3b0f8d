//! User model and storage trait.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AuthError, AuthResult};

// =============================================================================
// User Type
// =============================================================================

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier, also the `sub` claim of the user's tokens.
    pub id: Uuid,

    /// Login name.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Argon2 PHC hash; `None` for accounts that cannot log in with a password.
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,

    /// Disabled accounts cannot authenticate.
    pub is_active: bool,

    /// Administrator flag, set for the bootstrap admin. Carried on the
    /// identity for downstream handlers; the guard itself does not read it.
    #[serde(default)]
    pub is_superuser: bool,

    /// When the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user builder.
    #[must_use]
    pub fn builder(username: impl Into<String>, email: impl Into<String>) -> UserBuilder {
        UserBuilder::new(username, email)
    }

    /// Returns `true` if the account is enabled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Checks a plaintext password against the stored hash.
    ///
    /// Accounts without a password hash never match.
    #[must_use]
    pub fn check_password(&self, password: &str) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash).unwrap_or(false))
    }

    /// Read-only projection handed to request handlers.
    #[must_use]
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            created_at: self.created_at,
        }
    }
}

/// Builder for [`User`].
pub struct UserBuilder {
    user: User,
    password: Option<String>,
}

impl UserBuilder {
    fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            user: User {
                id: Uuid::new_v4(),
                username: username.into(),
                email: email.into(),
                full_name: None,
                password_hash: None,
                is_active: true,
                is_superuser: false,
                created_at: now,
                updated_at: now,
            },
            password: None,
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.user.id = id;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.user.full_name = Some(full_name.into());
        self
    }

    /// Sets a plaintext password, hashed on [`UserBuilder::build`].
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.user.is_active = active;
        self
    }

    /// Sets the superuser flag.
    #[must_use]
    pub fn superuser(mut self, superuser: bool) -> Self {
        self.user.is_superuser = superuser;
        self
    }

    /// Builds the user, hashing the password if one was given.
    ///
    /// # Errors
    /// Returns an error if password hashing fails.
    pub fn build(mut self) -> AuthResult<User> {
        if let Some(password) = self.password.take() {
            let hash = hash_password(&password)
                .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
            self.user.password_hash = Some(hash);
        }
        Ok(self.user)
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Public view of a user; never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    /// User id.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Account enabled.
    pub is_active: bool,
    /// Superuser flag.
    pub is_superuser: bool,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password with Argon2id and a random salt.
///
/// # Errors
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies a password against a PHC-formatted Argon2 hash.
///
/// # Errors
/// Returns an error only if the hash itself is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// =============================================================================
// Storage Trait
// =============================================================================

/// Storage trait for user accounts.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>>;

    /// Finds a user by login name.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Stores a new user.
    ///
    /// # Errors
    /// Returns an error if the id or username is taken or storage fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Enables or disables an account. Returns `false` if the user is unknown.
    ///
    /// # Errors
    /// Returns an error if the storage operation fails.
    async fn set_active(&self, user_id: Uuid, active: bool) -> AuthResult<bool>;
}
