//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feedwatch_core::ResolveError;
use serde_json::json;
use thiserror::Error;

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error type for consistent error responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - the link can't be resolved.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));
        (status, body).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        // Fetch failures and missing rows are both reported as client errors
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedwatch_core::FetchError;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_resolve_errors_are_bad_requests() {
        let not_found = ApiError::from(ResolveError::NotFound {
            id: "show-a".into(),
            type_label: "WEBRip 1080p".into(),
        });
        assert_eq!(not_found.status_code(), StatusCode::BAD_REQUEST);

        let fetch = ApiError::from(ResolveError::Fetch {
            id: "show-a".into(),
            source: FetchError::Status {
                url: "https://example.org".into(),
                status: 502,
            },
        });
        assert_eq!(fetch.status_code(), StatusCode::BAD_REQUEST);
    }
}
