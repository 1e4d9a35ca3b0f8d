//! Authentication configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! secret = "a-long-random-string-of-at-least-32-bytes"
//! algorithm = "HS256"
//! issuer = "quorum"
//! access_token_lifetime = "30m"
//! refresh_token_lifetime = "7d"
//!
//! [revocation]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::token::jwt::HmacAlgorithm;

/// Minimum accepted length of the HMAC signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted access or refresh token lifetime (one year).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 3600);

/// Errors raised while validating auth configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A field has an unusable value.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Token signing and lifetime settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret shared by issuer and verifier.
    pub secret: String,

    /// Signing algorithm: "HS256", "HS384" or "HS512".
    pub algorithm: String,

    /// Value of the `iss` claim; tokens from other issuers are rejected.
    pub issuer: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Clock skew tolerated when checking `exp`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// How often expired revocation records are purged.
    #[serde(with = "humantime_serde")]
    pub purge_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: "HS256".to_string(),
            issuer: "quorum".to_string(),
            access_token_lifetime: Duration::from_secs(30 * 60),
            refresh_token_lifetime: Duration::from_secs(7 * 24 * 3600),
            leeway: Duration::from_secs(30),
            purge_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "auth.secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        self.algorithm
            .parse::<HmacAlgorithm>()
            .map_err(|e| ConfigError::invalid("auth.algorithm", e))?;
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::invalid("auth.issuer", "must not be empty"));
        }
        if self.access_token_lifetime.is_zero() {
            return Err(ConfigError::invalid(
                "auth.access_token_lifetime",
                "must be > 0",
            ));
        }
        if self.access_token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(ConfigError::invalid(
                "auth.access_token_lifetime",
                "must be at most 365 days",
            ));
        }
        if self.refresh_token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(ConfigError::invalid(
                "auth.refresh_token_lifetime",
                "must be at most 365 days",
            ));
        }
        if self.refresh_token_lifetime < self.access_token_lifetime {
            return Err(ConfigError::invalid(
                "auth.refresh_token_lifetime",
                "must be >= access_token_lifetime",
            ));
        }
        if self.purge_interval.is_zero() {
            return Err(ConfigError::invalid("auth.purge_interval", "must be > 0"));
        }
        Ok(())
    }
}

/// Where revoked tokens are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RevocationBackend {
    /// Process-local map; revocations are lost on restart.
    #[default]
    Memory,
    /// Shared Redis instance.
    Redis,
}

/// Revocation store settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RevocationConfig {
    /// Store backend.
    pub backend: RevocationBackend,
    /// Redis connection URL, required for the redis backend.
    pub redis_url: Option<String>,
}

impl RevocationConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error when the redis backend has no URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == RevocationBackend::Redis
            && self.redis_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::invalid(
                "revocation.redis_url",
                "required when backend = \"redis\"",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AuthConfig {
        AuthConfig {
            secret: "x".repeat(MIN_SECRET_LEN),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_default_requires_secret() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "auth.secret",
                ..
            }
        ));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        let cfg = AuthConfig {
            algorithm: "RS256".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_refresh_shorter_than_access_rejected() {
        let cfg = AuthConfig {
            access_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(60),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_lifetimes_are_capped_at_one_year() {
        let cfg = AuthConfig {
            refresh_token_lifetime: MAX_TOKEN_LIFETIME + Duration::from_secs(1),
            ..valid()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue {
                field: "auth.refresh_token_lifetime",
                ..
            })
        ));

        let cfg = AuthConfig {
            access_token_lifetime: Duration::from_secs(20_000 * 365 * 24 * 3600),
            refresh_token_lifetime: Duration::from_secs(20_000 * 365 * 24 * 3600),
            ..valid()
        };
        assert!(cfg.validate().is_err());

        let cfg = AuthConfig {
            access_token_lifetime: MAX_TOKEN_LIFETIME,
            refresh_token_lifetime: MAX_TOKEN_LIFETIME,
            ..valid()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_humantime_deserialization() {
        let cfg: AuthConfig = serde_json::from_str(
            r#"{"secret": "s", "access_token_lifetime": "15m", "leeway": "5s"}"#,
        )
        .unwrap();
        assert_eq!(cfg.access_token_lifetime, Duration::from_secs(900));
        assert_eq!(cfg.leeway, Duration::from_secs(5));
        assert_eq!(cfg.algorithm, "HS256");
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let cfg = RevocationConfig {
            backend: RevocationBackend::Redis,
            redis_url: None,
        };
        assert!(cfg.validate().is_err());
        assert!(RevocationConfig::default().validate().is_ok());
    }
}
