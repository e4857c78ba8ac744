use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::BackupStatus;
use crate::quota::QuotaViolation;
use crate::storage::StorageError;

/// Every failure a handler can report, each with a fixed HTTP status
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    LimitExceeded(#[from] QuotaViolation),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Backup cannot move from {from} to {to}")]
    InvalidTransition { from: BackupStatus, to: BackupStatus },

    #[error("{0}")]
    Upstream(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LimitExceeded(violation) => violation.status(),
            AppError::Validation(_) | AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Store query failed");
                "Internal server error".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = ?e, "JSON encoding failed");
                "Internal server error".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!(error = ?e, "Object storage call failed");
                "Storage provider error".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::error!(reason = %msg, "Upstream service failed");
                msg.clone()
            }
            AppError::LimitExceeded(violation) => {
                tracing::info!(%violation, "Quota rejection");
                violation.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::unauthorized("nope").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InvalidTransition {
                from: BackupStatus::Deleted,
                to: BackupStatus::Completed
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::LimitExceeded(QuotaViolation::BackupCountReached {
                limit: 3,
                current: 3
            })
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_transition_message() {
        let err = AppError::InvalidTransition {
            from: BackupStatus::Deleted,
            to: BackupStatus::Uploading,
        };
        assert_eq!(err.to_string(), "Backup cannot move from deleted to uploading");
    }
}
