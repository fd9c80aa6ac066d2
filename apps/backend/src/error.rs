//! Application error types for the SongHub backend.
//!
//! Provides a unified error type that implements `IntoResponse` for Axum.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::models::TrackRequestStatus;
use crate::db::DbError;
use crate::services::storage::StorageError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// SQLite-specific errors (for direct rusqlite usage)
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration loading/parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Referenced song, track, track request or user is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Caller lacks permission for the requested mutation
    #[error("Not authorized")]
    NotAuthorized,

    /// Invalid request data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Submission against a track that is not an open slot
    #[error("Track is not open for contributions")]
    TrackNotOpen,

    /// Track request is not in the state the operation expects
    #[error("Track request is {from}, cannot become {to}")]
    InvalidStateTransition {
        from: TrackRequestStatus,
        to: TrackRequestStatus,
    },

    /// Staging or uploading an audio payload failed
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] StorageError),

    /// Object store operation failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Sqlite(e) => {
                tracing::error!("SQLite error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", None)
            }
            AppError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "not_found", Some(resource.clone()))
            }
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotAuthorized => (StatusCode::FORBIDDEN, "not_authorized", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::TrackNotOpen => (
                StatusCode::CONFLICT,
                "track_not_open",
                Some(self.to_string()),
            ),
            AppError::InvalidStateTransition { .. } => (
                StatusCode::CONFLICT,
                "invalid_state_transition",
                Some(self.to_string()),
            ),
            AppError::UploadFailed(e) => {
                tracing::warn!(error = %e, "Audio upload failed");
                (StatusCode::BAD_GATEWAY, "upload_failed", None)
            }
            AppError::Storage(e) => {
                tracing::warn!(error = %e, "Object storage error");
                let (status, code) = match e {
                    StorageError::Unavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
                    }
                    StorageError::Denied(_) => (StatusCode::BAD_GATEWAY, "storage_denied"),
                    StorageError::NotFound(_) => (StatusCode::BAD_GATEWAY, "storage_not_found"),
                    StorageError::InvalidKey(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "storage_invalid_key")
                    }
                };
                (status, code, None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        let error = AppError::NotFound("test".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthenticated_status() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_not_authorized_status() {
        let response = AppError::NotAuthorized.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_workflow_conflicts() {
        let response = AppError::TrackNotOpen.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let error = AppError::InvalidStateTransition {
            from: TrackRequestStatus::Approved,
            to: TrackRequestStatus::Declined,
        };
        assert_eq!(error.to_string(), "Track request is approved, cannot become declined");
        assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_statuses() {
        let unavailable = AppError::Storage(StorageError::Unavailable("timeout".to_string()));
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let denied = AppError::Storage(StorageError::Denied("403".to_string()));
        assert_eq!(denied.into_response().status(), StatusCode::BAD_GATEWAY);

        let upload = AppError::UploadFailed(StorageError::Unavailable("reset".to_string()));
        assert_eq!(upload.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
