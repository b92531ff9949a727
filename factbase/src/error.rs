use std::fmt;

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::v1::response::ApiResponse;

#[derive(Error, Debug)]
pub enum FactbaseError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Corrupt stored row: {0}")]
    CorruptRow(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tenant scope violation: {0}")]
    TenantScopeViolation(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider rate limit exceeded, retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    #[error("Provider authentication error: {0}")]
    Auth(String),

    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Stable classification of a [`FactbaseError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimited,
    Auth,
    Transient,
    Schema,
    TenantScopeViolation,
    Validation,
    NotFound,
    DimensionMismatch,
    Cancelled,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Auth => "auth_error",
            Self::Transient => "transient_error",
            Self::Schema => "schema_error",
            Self::TenantScopeViolation => "tenant_scope_violation",
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::Cancelled => "cancelled",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FactbaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Schema(_) => ErrorKind::Schema,
            Self::TenantScopeViolation(_) => ErrorKind::TenantScopeViolation,
            Self::Validation(_) | Self::Json(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::LlmUnavailable(_) => ErrorKind::Unavailable,
            Self::Database(_)
            | Self::CorruptRow(_)
            | Self::Embedding(_)
            | Self::Io(_)
            | Self::Llm(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only rate limits and transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Transient)
    }

    /// Provider-suggested delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimited {
                retry_after: Some(secs),
            } => Some(std::time::Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

impl From<tokio::time::error::Elapsed> for FactbaseError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        FactbaseError::Transient("operation timed out".to_string())
    }
}

impl IntoResponse for FactbaseError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, FactbaseError>;
