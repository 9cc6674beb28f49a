//! Domain error types for the deployment server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required external-service credential is not configured
    #[error("{service} token not configured")]
    CredentialsMissing {
        service: &'static str,
        env_var: &'static str,
    },

    /// The source-control host already has a repository with this name
    #[error("Repository already exists: {0}")]
    RepoAlreadyExists(String),

    /// An external host answered with a failure not otherwise classified
    #[error("{service} request failed: {message}")]
    Upstream { service: String, message: String },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Caller may not act on this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    /// Shorthand for an upstream failure from a named service.
    pub fn upstream(service: &str, message: impl Into<String>) -> Self {
        AppError::Upstream {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Machine-readable error code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::CredentialsMissing { .. } => "CREDENTIALS_MISSING",
            AppError::RepoAlreadyExists(_) => "REPO_ALREADY_EXISTS",
            AppError::Upstream { .. } => "UPSTREAM_REQUEST_FAILED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }

    /// Build the client-facing body. Database details stay server-side.
    pub fn to_error_response(&self) -> ErrorResponse {
        let (error, details) = match self {
            AppError::CredentialsMissing { env_var, .. } => (
                self.to_string(),
                Some(format!("Please add {} to the server environment", env_var)),
            ),
            AppError::RepoAlreadyExists(_) => (
                "Repository already exists".to_string(),
                Some(
                    "A repository with this name already exists. Please choose a different name."
                        .to_string(),
                ),
            ),
            AppError::Upstream { service, message } => (
                format!("{} request failed", service),
                Some(message.clone()),
            ),
            AppError::Database(_) => ("An internal database error occurred".to_string(), None),
            _ => (self.to_string(), None),
        };

        ErrorResponse {
            code: self.code().to_string(),
            error,
            details,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::CredentialsMissing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RepoAlreadyExists(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Database(err_str) => tracing::error!("Database error: {}", err_str),
            AppError::Upstream { service, message } => {
                tracing::warn!(service = %service, "Upstream failure: {}", message)
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(self.to_error_response())
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.error)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let host = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("external host")
            .to_string();
        AppError::Upstream {
            service: host,
            message: err.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}
