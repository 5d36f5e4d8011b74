//! API error handling for the telemetry node

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::ReadingError;

/// JSON error body: `{ "error": ..., "message": ... }` with the HTTP status in `code`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(code: u16, error: &str) -> Self {
        Self {
            code,
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(code: u16, error: &str, message: String) -> Self {
        Self {
            code,
            error: error.to_string(),
            message: Some(message),
        }
    }

    // Common error constructors
    pub fn bad_request(error: &str) -> Self {
        Self::new(400, error)
    }

    pub fn reading_not_found(message: String) -> Self {
        Self::with_message(404, "Reading not found", message)
    }

    pub fn endpoint_not_found() -> Self {
        Self::new(404, "Endpoint not found")
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::with_message(500, "Internal server error", message.to_string())
    }

    /// Map a pipeline failure onto a response. `context` names the failed
    /// operation and becomes the `error` field of 500 responses.
    pub fn from_reading(err: ReadingError, context: &str) -> Self {
        match err {
            ReadingError::InvalidInput(reason) => Self::bad_request(&reason),
            ReadingError::NotFound { .. } | ReadingError::EmptyLedger => {
                Self::reading_not_found(err.to_string())
            }
            ReadingError::LedgerUnavailable(_) | ReadingError::DecryptionFailed(_) => {
                Self::with_message(500, context, err.to_string())
            }
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.code >= 500
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "API Error {}: {} ({})", self.code, self.error, message),
            None => write!(f, "API Error {}: {}", self.code, self.error),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!("Rejected path parameter: {}", rejection.body_text());
        Self::bad_request("Invalid index parameter")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::with_message(400, "Invalid query parameters", rejection.body_text())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_errors_map_to_status() {
        let invalid = ApiError::from_reading(ReadingError::InvalidInput("bad".into()), "ctx");
        assert_eq!(invalid.code, 400);
        assert_eq!(invalid.error, "bad");

        let missing = ApiError::from_reading(ReadingError::NotFound { index: 5, total: 5 }, "ctx");
        assert_eq!(missing.code, 404);
        assert_eq!(missing.error, "Reading not found");
        assert_eq!(
            missing.message.as_deref(),
            Some("Index 5 is out of range. Total readings: 5")
        );

        let ledger = ApiError::from_reading(ReadingError::LedgerUnavailable("timeout".into()), "Failed to get reading count");
        assert_eq!(ledger.code, 500);
        assert_eq!(ledger.error, "Failed to get reading count");
        assert_eq!(ledger.message.as_deref(), Some("timeout"));
        assert!(ledger.is_server_error());

        let decrypt = ApiError::from_reading(ReadingError::DecryptionFailed("tag".into()), "ctx");
        assert_eq!(decrypt.code, 500);
    }

    #[test]
    fn test_body_omits_code_and_empty_message() {
        let body = serde_json::to_value(ApiError::endpoint_not_found()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Endpoint not found" }));
    }

    #[test]
    fn test_into_response_uses_code() {
        let response = ApiError::bad_request("Invalid index parameter").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::new(999, "odd").into_response();
        assert_eq!(response.status(), StatusCode::from_u16(999).unwrap());
    }
}
