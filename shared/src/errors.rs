//! # Application Error Types
//!
//! `ApiError` is the closed outcome taxonomy every resource service reports
//! through: `INVALID_PARAMS`, `AUTH_ERROR`, `NOT_FOUND`, `FORBIDDEN`,
//! `DB_ERROR`, `MEMORY_ERROR`, `JSON_ERROR`. Handlers translate each variant
//! to an HTTP status through a frozen mapping (`status_code`); the body is
//! always `{"error": "<message>"}`.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Application error type with automatic HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or query parameters failed a C2 validator.
    /// Returns 400 Bad Request.
    #[error("invalid parameters")]
    InvalidParams,

    /// Session or API key failed credential validation.
    /// Returns 401 Unauthorized.
    #[error("authentication failed")]
    AuthError,

    /// Requested resource does not exist (or the caller isn't allowed to
    /// learn that it does).
    /// Returns 404 Not Found.
    #[error("not found")]
    NotFound,

    /// Caller is authenticated but not permitted to perform this action,
    /// or a quota was exceeded.
    /// Returns 403 Forbidden.
    #[error("forbidden")]
    Forbidden,

    /// The database driver returned an error executing a query.
    /// Returns 500 Internal Server Error.
    #[error("database error")]
    DbError(#[from] postgres::Error),

    /// Password hashing ran out of memory (Argon2's configured memory cost
    /// could not be allocated).
    /// Returns 500 Internal Server Error.
    #[error("memory error")]
    MemoryError,

    /// Response body failed to serialize to JSON.
    /// Returns 500 Internal Server Error.
    #[error("json error")]
    JsonError(#[from] serde_json::Error),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParams => "INVALID_PARAMS",
            Self::AuthError => "AUTH_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::DbError(_) => "DB_ERROR",
            Self::MemoryError => "MEMORY_ERROR",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParams => StatusCode::BAD_REQUEST,
            Self::AuthError => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DbError(_) | Self::MemoryError | Self::JsonError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::DbError(_) | Self::MemoryError | Self::JsonError(_))
    }
}

/// Error response body: `{"error": "<message>"}`, per the frozen contract.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: &ApiError) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        ApiError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_errors_return_401() {
        assert_eq!(ApiError::AuthError.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn authorization_errors_return_403() {
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn resource_errors() {
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidParams.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_codes_are_screaming_snake_case() {
        assert_eq!(ApiError::InvalidParams.error_code(), "INVALID_PARAMS");
        assert_eq!(ApiError::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(ApiError::MemoryError.error_code(), "MEMORY_ERROR");
    }

    #[test]
    fn server_errors_are_flagged() {
        assert!(ApiError::MemoryError.is_server_error());
        assert!(!ApiError::AuthError.is_server_error());
        assert!(!ApiError::NotFound.is_server_error());
    }

    #[test]
    fn error_body_matches_frozen_shape() {
        let error = ApiError::Forbidden;
        let body = ErrorResponse::new(&error);
        assert_eq!(body.error, "forbidden");
    }
}
