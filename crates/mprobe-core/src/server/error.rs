//! JSON error responses.

use crate::analysis::{AnalysisError, FailureCause, UnknownFormat};
use crate::proxy::{BadLinkError, ProxyError};
use crate::target::UnsafeTargetError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// An error answered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<UnsafeTargetError> for ApiError {
    fn from(e: UnsafeTargetError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<UnknownFormat> for ApiError {
    fn from(e: UnknownFormat) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<BadLinkError> for ApiError {
    fn from(e: BadLinkError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        let status = match &e {
            AnalysisError::Concurrent(_) => StatusCode::CONFLICT,
            AnalysisError::Setup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::Failed(f) => match f.cause {
                FailureCause::Core(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FailureCause::Fetch(_) | FailureCause::RequestLimit(_) => StatusCode::BAD_GATEWAY,
            },
        };
        Self::new(status, e.to_string())
    }
}

impl From<ProxyError> for ApiError {
    fn from(e: ProxyError) -> Self {
        match e {
            ProxyError::Unsafe(e) => e.into(),
            ProxyError::Upstream(e) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    }
}
