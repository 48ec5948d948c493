//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::infra::AgentError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    /// Blocked by dependent records (e.g. users still assigned to a gateway)
    #[error("{0}")]
    PrecheckFailed(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // Provisioning
    #[error("No gateway is currently available")]
    NoGatewayAvailable,

    #[error("Assigned gateway no longer exists")]
    GatewayMissing,

    #[error("No free tunnel address left on gateway")]
    AddressExhausted,

    // External service errors
    #[error("Gateway agent error")]
    Agent(#[from] AgentError),

    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PrecheckFailed(_) => "PRECHECK_FAILED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NoGatewayAvailable => "NO_GATEWAY_AVAILABLE",
            AppError::GatewayMissing => "GATEWAY_MISSING",
            AppError::AddressExhausted => "ADDRESS_EXHAUSTED",
            AppError::Agent(_) => "AGENT_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials | AppError::Jwt(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PrecheckFailed(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NoGatewayAvailable
            | AppError::GatewayMissing
            | AppError::AddressExhausted => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Agent(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::PrecheckFailed(msg) => msg.clone(),
            AppError::Conflict(msg) => format!("{} already exists", msg),

            // Hide details for internal/security errors
            AppError::Agent(e) => {
                tracing::error!(error = %e, "Gateway agent call failed");
                "Failed to generate config".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn precheck(msg: impl Into<String>) -> Self {
        AppError::PrecheckFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_errors_map_to_service_unavailable() {
        assert_eq!(
            AppError::NoGatewayAvailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::GatewayMissing.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::AddressExhausted.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_agent_error_hides_remote_body() {
        let err = AppError::from(AgentError::Rejected {
            status: 500,
            body: "wg: interface wg0 not found".to_string(),
        });

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "AGENT_ERROR");
        assert!(!err.user_message().contains("wg0"));
    }

    #[test]
    fn test_precheck_keeps_message() {
        let err = AppError::precheck("Cannot delete gateway: 3 user(s) are assigned to it");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.user_message(),
            "Cannot delete gateway: 3 user(s) are assigned to it"
        );
    }
}
