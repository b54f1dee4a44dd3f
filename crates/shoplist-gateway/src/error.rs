//! API error types and responses.
//!
//! Every error body is `{"error": "<message>"}`. Authentication failures
//! collapse into two messages so clients cannot tell which check failed; the
//! precise kind only reaches the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use shoplist_auth::AuthError;
use shoplist_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not permitted, or from a disallowed origin.
    #[error("forbidden")]
    Forbidden,

    /// Login failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the response body.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => "invalid token".to_string(),
            Self::Forbidden => "forbidden".to_string(),
            Self::InvalidCredentials => "invalid credentials".to_string(),
            Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
            Self::Internal(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_internal() {
            tracing::error!(kind = err.kind(), error = %err, "Auth internal error");
            return Self::Internal(err.to_string());
        }

        tracing::warn!(kind = err.kind(), error = %err, "Request rejected");
        match err {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            _ if err.http_status_code() == 403 => Self::Forbidden,
            _ => Self::Unauthorized,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_) => Self::Conflict("username taken".to_string()),
            other => {
                tracing::error!(error = %other, "Store error");
                Self::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_core::UserId;

    #[test]
    fn error_status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_errors_collapse() {
        let cases = [
            AuthError::MissingToken,
            AuthError::BadSignature,
            AuthError::TokenExpired,
            AuthError::UnknownUser(UserId::new(4).unwrap()),
            AuthError::TokenNotIssuedByServer,
            AuthError::InvalidAdminKey("bad".into()),
        ];
        for err in cases {
            let api = ApiError::from(err);
            assert_eq!(api.public_message(), "invalid token");
            assert_eq!(api.status_code(), StatusCode::UNAUTHORIZED);
        }

        for err in [AuthError::InsufficientPrivilege, AuthError::KeyMismatch] {
            assert_eq!(ApiError::from(err).public_message(), "forbidden");
        }
    }

    #[test]
    fn internal_detail_is_hidden() {
        let api = ApiError::from(AuthError::Ledger("/var/lib/tokens.txt: EIO".into()));
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.public_message(), "internal error");
    }

    #[test]
    fn username_taken_is_conflict() {
        let api = ApiError::from(StoreError::UsernameTaken("alice".into()));
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
    }
}
