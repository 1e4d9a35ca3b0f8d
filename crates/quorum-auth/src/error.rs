//! Authentication error types.
//!
//! Every credential failure is an [`AuthError::Unauthenticated`] carrying a
//! [`RejectReason`]. The reason is for logs and audit only: the HTTP layer
//! renders all of them as the same 401 response.

use std::fmt;

/// Why the auth guard refused a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// No bearer credential was presented.
    MissingCredentials,
    /// The token is on the revocation list.
    Revoked,
    /// Signature, structure, algorithm or issuer check failed.
    InvalidCredentials,
    /// The token is past its `exp` claim.
    Expired,
    /// The token was issued for another purpose (refresh, reset, ...).
    WrongTokenType,
    /// The subject claim does not name a known user.
    UserNotFound,
    /// The user exists but the account is disabled.
    InactiveAccount,
    /// A collaborator failed unexpectedly; the guard failed closed.
    Internal,
}

impl RejectReason {
    /// Stable machine-readable code for structured logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::Revoked => "revoked",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Expired => "expired",
            Self::WrongTokenType => "wrong_token_type",
            Self::UserNotFound => "user_not_found",
            Self::InactiveAccount => "inactive_account",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors produced by the auth crate.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request could not be authenticated.
    #[error("Unauthenticated: {reason}")]
    Unauthenticated {
        /// Internal reason, never shown to the client.
        reason: RejectReason,
    },

    /// Username/password login failed.
    #[error("Incorrect username or password")]
    InvalidLogin,

    /// The authenticated user may not perform the action.
    ///
    /// Nothing in this crate raises it. It exists so handlers built on the
    /// guard can report authorization failures with the same response shape.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The request body or parameters are malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// A backing store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates an `Unauthenticated` error with the given reason.
    #[must_use]
    pub fn unauthenticated(reason: RejectReason) -> Self {
        Self::Unauthenticated { reason }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the reject reason if this is an `Unauthenticated` error.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Unauthenticated { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. }
                | Self::InvalidLogin
                | Self::Forbidden { .. }
                | Self::InvalidRequest { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthenticated { .. } | Self::InvalidLogin => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of auth errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// Permission check failed.
    Authorization,
    /// Request validation failed.
    Validation,
    /// Storage or network failure.
    Infrastructure,
    /// Misconfiguration.
    Configuration,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
