use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::BookingStatus;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LifecycleError {
    /// Only optimistic-concurrency collisions are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::Conflict(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::Forbidden(_) => StatusCode::FORBIDDEN,
            LifecycleError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
            LifecycleError::Conflict(_) => StatusCode::CONFLICT,
            LifecycleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let LifecycleError::Storage(e) = &self {
            tracing::error!(error = %e, "storage failure");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LifecycleError::NotFound("booking".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LifecycleError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LifecycleError::InvalidTransition {
                from: BookingStatus::Completed,
                to: BookingStatus::Pending,
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LifecycleError::Conflict("stale".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LifecycleError::Storage(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(LifecycleError::Conflict("stale".into()).is_retryable());
        assert!(!LifecycleError::Storage(anyhow::anyhow!("boom")).is_retryable());
        assert!(!LifecycleError::Forbidden("no".into()).is_retryable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = LifecycleError::InvalidTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition from PENDING to COMPLETED"
        );
    }
}
