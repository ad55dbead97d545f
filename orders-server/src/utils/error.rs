//! Unified error handling for the HTTP layer
//!
//! # Error codes
//!
//! | Code | Status | Meaning |
//! |------|--------|---------|
//! | E0002 | 400 | Validation failed |
//! | E0003 | 404 | Order not found |
//! | E0004 | 409 | Order already exists |
//! | E0006 | 400 | Invalid request |
//! | E9001 | 500 | Internal error |
//! | E9002 | 500 | Stored data could not be decoded |
//! | E9003 | 503 | Storage backend unavailable |
//! | E9004 | 504 | Request cancelled or timed out |
//!
//! # Example
//!
//! ```ignore
//! Err(AppError::invalid(format!("Invalid order id: {}", raw)))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::orders::StoreError;

/// Error response body
///
/// ```json
/// { "error": "not_found", "code": "E0003", "message": "Order 42 not found" }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    /// 404
    NotFound(String),

    #[error("Resource already exists: {0}")]
    /// 409
    Conflict(String),

    #[error("Validation failed: {0}")]
    /// 400
    Validation(String),

    #[error("Invalid request: {0}")]
    /// 400
    Invalid(String),

    #[error("Corrupt data: {0}")]
    /// 500
    Corrupt(String),

    #[error("Internal server error: {0}")]
    /// 500
    Internal(String),

    #[error("Storage unavailable: {0}")]
    /// 503
    Unavailable(String),

    #[error("Request timed out: {0}")]
    /// 504
    Timeout(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::Corrupt(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, code, message) = match &self {
            AppError::NotFound(msg) => ("not_found", "E0003", msg.as_str()),
            AppError::Conflict(msg) => ("conflict", "E0004", msg.as_str()),
            AppError::Validation(msg) => ("validation_error", "E0002", msg.as_str()),
            AppError::Invalid(msg) => ("invalid_request", "E0006", msg.as_str()),

            AppError::Corrupt(msg) => {
                error!(target: "storage", error = %msg, "Stored order could not be decoded");
                ("corrupt_data", "E9002", "Stored data is corrupt")
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                ("internal_error", "E9001", "Internal server error")
            }
            AppError::Unavailable(msg) => {
                error!(target: "storage", error = %msg, "Storage backend failure");
                ("storage_unavailable", "E9003", "Storage backend unavailable")
            }
            AppError::Timeout(msg) => ("timeout", "E9004", msg.as_str()),
        };

        let body = Json(ErrorBody {
            error: error_type.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Order {} not found", id)),
            StoreError::Conflict(id) => AppError::Conflict(format!("Order {} already exists", id)),
            StoreError::Corrupt { .. } => AppError::Corrupt(e.to_string()),
            StoreError::Encode(_) => AppError::Internal(e.to_string()),
            StoreError::Transport(_) => AppError::Unavailable(e.to_string()),
            StoreError::Cancelled | StoreError::Timeout => AppError::Timeout(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvError;

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            AppError::from(StoreError::NotFound(7)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::Conflict(7)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Transport(KvError::Unavailable("down".into()))).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(StoreError::Timeout).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::from(StoreError::Cancelled).status(),
            StatusCode::GATEWAY_TIMEOUT
        );

        let source = serde_json::from_slice::<u64>(b"{").unwrap_err();
        let corrupt = AppError::from(StoreError::Corrupt {
            key: "order:7".into(),
            source,
        });
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_message_names_order() {
        let err = AppError::from(StoreError::NotFound(42));
        assert!(err.to_string().contains("Order 42 not found"));
    }

    #[test]
    fn test_response_status() {
        let response = AppError::invalid("bad id").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
