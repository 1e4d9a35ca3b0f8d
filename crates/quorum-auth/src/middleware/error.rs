//! Error response handling for authentication middleware.
//!
//! Every credential failure renders as the same 401 response; the reject
//! reason only reaches the logs.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// `WWW-Authenticate` value sent with every 401.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"quorum\"";

/// Client-facing detail for every rejected credential.
pub const UNAUTHENTICATED_DETAIL: &str = "Could not validate credentials";

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, detail) = error_details(&self);

        if status.is_server_error() {
            tracing::error!(category = %self.category(), error = %self, "Auth request failed");
        }

        let mut response = (status, Json(json!({ "error": code, "detail": detail }))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}

/// Returns (HTTP status, error code, client-facing detail).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::Unauthenticated { .. } => (
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            UNAUTHENTICATED_DETAIL.to_string(),
        ),
        AuthError::InvalidLogin => (
            StatusCode::UNAUTHORIZED,
            "invalid_login",
            error.to_string(),
        ),
        AuthError::Forbidden { message } => {
            (StatusCode::FORBIDDEN, "forbidden", message.clone())
        }
        AuthError::InvalidRequest { message } => {
            (StatusCode::BAD_REQUEST, "invalid_request", message.clone())
        }
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "Internal server error".to_string(),
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectReason;
    use axum::body::to_bytes;

    async fn parts(error: AuthError) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let www = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, www, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_all_rejections_render_identically() {
        let reasons = [
            RejectReason::MissingCredentials,
            RejectReason::Revoked,
            RejectReason::InvalidCredentials,
            RejectReason::Expired,
            RejectReason::WrongTokenType,
            RejectReason::UserNotFound,
            RejectReason::InactiveAccount,
            RejectReason::Internal,
        ];

        let expected = parts(AuthError::unauthenticated(RejectReason::MissingCredentials)).await;
        assert_eq!(expected.0, StatusCode::UNAUTHORIZED);
        assert_eq!(expected.1.as_deref(), Some("Bearer realm=\"quorum\""));
        assert_eq!(expected.2["error"], "unauthenticated");
        assert_eq!(expected.2["detail"], UNAUTHENTICATED_DETAIL);

        for reason in reasons {
            assert_eq!(parts(AuthError::unauthenticated(reason)).await, expected);
        }
    }

    #[tokio::test]
    async fn test_invalid_login_response() {
        let (status, www, body) = parts(AuthError::InvalidLogin).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(www.unwrap().starts_with("Bearer"));
        assert_eq!(body["error"], "invalid_login");
    }

    #[tokio::test]
    async fn test_forbidden_response() {
        let (status, www, body) = parts(AuthError::forbidden("Not a workspace member")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(www.is_none());
        assert_eq!(body["detail"], "Not a workspace member");
    }

    #[tokio::test]
    async fn test_invalid_request_response() {
        let (status, _, body) = parts(AuthError::invalid_request("missing field")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let (status, www, body) = parts(AuthError::storage("redis://secret@host down")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(www.is_none());
        assert!(!body.to_string().contains("secret"));
    }
}
