//! JWT issuing and verification.
//!
//! Tokens are HMAC-signed (`HS256`, `HS384` or `HS512`) with a shared secret.
//! Every token carries a `token_type` claim so that a refresh or password
//! reset token can never be used where an access token is expected.
//!
//! ## Example
//!
//! ```ignore
//! use quorum_auth::token::jwt::{HmacAlgorithm, JwtService, SigningKey};
//!
//! let key = SigningKey::new(HmacAlgorithm::HS256, secret)?;
//! let jwt = JwtService::new(key, "quorum");
//!
//! let pair = jwt.issue_pair(user_id)?;
//! let claims = jwt.decode(&pair.access_token)?;
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::config::{AuthConfig, MIN_SECRET_LEN};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Invalid key material.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if the token was well-formed but has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::decoding_error(err.to_string()),
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported HMAC signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HmacAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl HmacAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl FromStr for HmacAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(format!(
                "unsupported algorithm '{other}', expected HS256, HS384 or HS512"
            )),
        }
    }
}

impl fmt::Display for HmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Type
// ============================================================================

/// Declared purpose of a token (`token_type` claim).
///
/// Unknown tags are preserved as [`TokenType::Other`] so they can be logged
/// and rejected instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TokenType {
    /// Grants access to the API.
    Access,
    /// Exchanged for a new token pair.
    Refresh,
    /// Authorizes a password reset.
    Reset,
    /// Any other tag.
    Other(String),
}

impl TokenType {
    /// Returns the claim value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::Reset => "reset",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TokenType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "access" => Self::Access,
            "refresh" => Self::Refresh,
            "reset" => Self::Reset,
            _ => Self::Other(value),
        }
    }
}

impl From<TokenType> for String {
    fn from(value: TokenType) -> Self {
        match value {
            TokenType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Claims carried by every Quorum token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (user id).
    pub sub: String,

    /// Declared purpose.
    pub token_type: TokenType,

    /// Issuer.
    pub iss: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// JWT ID; makes two tokens issued in the same second distinct.
    pub jti: String,
}

impl TokenClaims {
    /// Creates a new builder for token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        token_type: TokenType,
    ) -> TokenClaimsBuilder {
        TokenClaimsBuilder::new(issuer, subject, token_type)
    }

    /// Natural expiry of the token.
    ///
    /// An `exp` outside the representable range saturates to the nearest
    /// bound, so a far-future token never reads as already expired.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or_else(|_| {
            if self.exp > 0 {
                PrimitiveDateTime::MAX.assume_utc()
            } else {
                PrimitiveDateTime::MIN.assume_utc()
            }
        })
    }
}

/// Builder for `TokenClaims`.
pub struct TokenClaimsBuilder {
    iss: String,
    sub: String,
    token_type: TokenType,
    iat: i64,
    exp: i64,
    jti: String,
}

impl TokenClaimsBuilder {
    fn new(issuer: impl Into<String>, subject: impl Into<String>, token_type: TokenType) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            token_type,
            iat: now,
            exp: now + 1800,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Sets the expiration time in seconds from the issue time.
    ///
    /// Negative values produce an already-expired token.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Builds the claims.
    #[must_use]
    pub fn build(self) -> TokenClaims {
        TokenClaims {
            sub: self.sub,
            token_type: self.token_type,
            iss: self.iss,
            iat: self.iat,
            exp: self.exp,
            jti: self.jti,
        }
    }
}

// ============================================================================
// Token Pair
// ============================================================================

/// Access and refresh token returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

// ============================================================================
// Decoder seam
// ============================================================================

/// Decodes and verifies bearer tokens.
///
/// Implemented by [`JwtService`]; the auth guard only depends on this trait.
pub trait TokenDecoder: Send + Sync {
    /// Verifies signature, structure and expiry and returns the claims.
    ///
    /// # Errors
    /// Returns an error if any check fails.
    fn decode(&self, token: &str) -> Result<TokenClaims, JwtError>;

    /// Returns `true` if the claims declare the expected purpose.
    fn verify_type(&self, claims: &TokenClaims, expected: &TokenType) -> bool {
        claims.token_type == *expected
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// HMAC key material.
#[derive(Clone)]
pub struct SigningKey {
    algorithm: HmacAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Creates a key from a shared secret.
    ///
    /// # Errors
    /// Returns an error if the secret is shorter than the minimum length.
    pub fn new(algorithm: HmacAlgorithm, secret: &[u8]) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::invalid_key(format!(
                "secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for issuing and verifying JWT tokens.
///
/// This service is `Send + Sync` and can be shared across async tasks.
#[derive(Debug)]
pub struct JwtService {
    signing_key: SigningKey,
    issuer: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
    leeway: Duration,
}

impl JwtService {
    /// Creates a new JWT service with default lifetimes.
    #[must_use]
    pub fn new(signing_key: SigningKey, issuer: impl Into<String>) -> Self {
        let defaults = AuthConfig::default();
        Self {
            signing_key,
            issuer: issuer.into(),
            access_lifetime: defaults.access_token_lifetime,
            refresh_lifetime: defaults.refresh_token_lifetime,
            leeway: defaults.leeway,
        }
    }

    /// Creates a JWT service from auth configuration.
    ///
    /// # Errors
    /// Returns an error if the algorithm or secret is invalid.
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwtError> {
        let algorithm = config
            .algorithm
            .parse::<HmacAlgorithm>()
            .map_err(JwtError::invalid_key)?;
        let key = SigningKey::new(algorithm, config.secret.as_bytes())?;
        Ok(Self::new(key, config.issuer.clone())
            .with_lifetimes(config.access_token_lifetime, config.refresh_token_lifetime)
            .with_leeway(config.leeway))
    }

    /// Overrides token lifetimes.
    #[must_use]
    pub fn with_lifetimes(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_lifetime = access;
        self.refresh_lifetime = refresh;
        self
    }

    /// Overrides the accepted clock skew.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        let header = Header::new(self.signing_key.algorithm.to_jwt_algorithm());
        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Issues an access token for the user.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, JwtError> {
        self.issue(user_id, TokenType::Access, self.access_lifetime)
    }

    /// Issues a refresh token for the user.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, JwtError> {
        self.issue(user_id, TokenType::Refresh, self.refresh_lifetime)
    }

    /// Issues an access/refresh pair for the user.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id)?,
            refresh_token: self.issue_refresh(user_id)?,
            token_type: "bearer".to_string(),
            expires_in: self.access_lifetime.as_secs(),
        })
    }

    fn issue(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<String, JwtError> {
        let seconds = i64::try_from(lifetime.as_secs())
            .map_err(|_| JwtError::encoding_error("token lifetime out of range"))?;
        let claims = TokenClaims::builder(&self.issuer, user_id.to_string(), token_type)
            .expires_in_seconds(seconds)
            .build();
        self.encode(&claims)
    }

    /// Decodes and validates a JWT string.
    ///
    /// Checks signature, algorithm, issuer and expiry.
    ///
    /// # Errors
    /// Returns an error if decoding or validation fails.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.signing_key.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = self.leeway.as_secs();
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string(), "iss".to_string()]);

        decode::<TokenClaims>(token, &self.signing_key.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the access token lifetime.
    #[must_use]
    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }
}

impl TokenDecoder for JwtService {
    fn decode(&self, token: &str) -> Result<TokenClaims, JwtError> {
        JwtService::decode(self, token)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    fn service() -> JwtService {
        let key = SigningKey::new(HmacAlgorithm::HS256, SECRET).unwrap();
        JwtService::new(key, "quorum-test").with_leeway(Duration::ZERO)
    }

    #[test]
    fn test_issue_and_decode_access_token() {
        let jwt = service();
        let user_id = Uuid::new_v4();

        let token = jwt.issue_access(user_id).unwrap();
        let claims = jwt.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, "quorum-test");
        assert!(!claims.jti.is_empty());
        assert!(jwt.verify_type(&claims, &TokenType::Access));
        assert!(!jwt.verify_type(&claims, &TokenType::Refresh));
    }

    #[test]
    fn test_issue_pair() {
        let jwt = service();
        let pair = jwt.issue_pair(Uuid::new_v4()).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, jwt.access_lifetime().as_secs());
        let refresh = jwt.decode(&pair.refresh_token).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = service();
        let claims = TokenClaims::builder("quorum-test", "u", TokenType::Access)
            .expires_in_seconds(-120)
            .build();
        let token = jwt.encode(&claims).unwrap();

        let err = jwt.decode(&token).unwrap_err();
        assert!(err.is_expired());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = service();
        let other = JwtService::new(
            SigningKey::new(HmacAlgorithm::HS256, b"another-secret-that-is-long-enough-too").unwrap(),
            "quorum-test",
        );
        let token = other.issue_access(Uuid::new_v4()).unwrap();

        assert!(matches!(
            jwt.decode(&token).unwrap_err(),
            JwtError::InvalidSignature
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let jwt = service();
        let claims = TokenClaims::builder("someone-else", "u", TokenType::Access).build();
        let token = jwt.encode(&claims).unwrap();

        assert!(matches!(
            jwt.decode(&token).unwrap_err(),
            JwtError::InvalidClaims { .. }
        ));
    }

    #[test]
    fn test_expires_at_saturates_far_future() {
        let claims = TokenClaims::builder("quorum-test", "u", TokenType::Access)
            .expires_in_seconds(20_000 * 365 * 24 * 3600)
            .build();
        assert!(claims.expires_at() > OffsetDateTime::now_utc() + time::Duration::days(365));

        let claims = TokenClaims::builder("quorum-test", "u", TokenType::Access)
            .expires_in_seconds(3600)
            .build();
        assert_eq!(claims.expires_at().unix_timestamp(), claims.exp);
    }

    #[test]
    fn test_garbage_rejected() {
        let jwt = service();
        assert!(jwt.decode("not-a-jwt").is_err());
        assert!(jwt.decode("a.b.c").is_err());
        assert!(jwt.decode("").is_err());
    }

    #[test]
    fn test_unknown_token_type_preserved() {
        let jwt = service();
        let claims =
            TokenClaims::builder("quorum-test", "u", TokenType::from("magic".to_string())).build();
        let token = jwt.encode(&claims).unwrap();

        let decoded = jwt.decode(&token).unwrap();
        assert_eq!(decoded.token_type, TokenType::Other("magic".into()));
        assert_eq!(decoded.token_type.to_string(), "magic");
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(SigningKey::new(HmacAlgorithm::HS256, b"short").is_err());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("hs384".parse::<HmacAlgorithm>(), Ok(HmacAlgorithm::HS384));
        assert!("RS256".parse::<HmacAlgorithm>().is_err());
        assert_eq!(HmacAlgorithm::HS512.to_string(), "HS512");
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig {
            secret: String::from_utf8(SECRET.to_vec()).unwrap(),
            access_token_lifetime: Duration::from_secs(60),
            ..AuthConfig::default()
        };
        let jwt = JwtService::from_config(&config).unwrap();
        assert_eq!(jwt.issuer(), "quorum");
        assert_eq!(jwt.access_lifetime(), Duration::from_secs(60));
    }
}
