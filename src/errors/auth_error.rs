use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication failures
///
/// On HTTP routes these become JSON error responses; on the session socket
/// they are reported as an `UNAUTHORIZED` error event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Email not allowed: {0}")]
    EmailNotAllowed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication configuration error: {0}")]
    ConfigError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired
            | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotAllowed(_) => StatusCode::FORBIDDEN,
            AuthError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable error code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::EmailNotAllowed(_) => "email_not_allowed",
            AuthError::Unauthorized(_) => "unauthorized",
            AuthError::ConfigError(_) => "auth_config_error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Don't leak configuration details to clients
        let message = match &self {
            AuthError::ConfigError(_) => "Authentication service unavailable".to_string(),
            other => other.to_string(),
        };
        (
            status,
            Json(json!({
                "error": self.code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::MissingAuthHeader.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::EmailNotAllowed("a@b.c".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::ConfigError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = AuthError::InvalidToken("bad signature".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::ConfigError("no secret".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
