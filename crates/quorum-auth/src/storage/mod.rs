//! Storage traits and backends for users and revoked tokens.

pub mod memory;
pub mod revoked_token;
pub mod user;

pub use memory::{InMemoryTokenBlacklist, InMemoryUserStorage};
pub use revoked_token::{RedisTokenBlacklist, TokenBlacklist, token_fingerprint};
pub use user::{User, UserBuilder, UserResponse, UserStorage, hash_password, verify_password};
