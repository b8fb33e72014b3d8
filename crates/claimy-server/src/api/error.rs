//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use claimy_core::NegotiationError;
use serde::Serialize;
use thiserror::Error;

use crate::core::IssueError;

/// API error type
///
/// Response bodies carry a stable code and a generic message only; the
/// underlying cause is for logs.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            ApiError::BadRequest(_) => ("BAD_REQUEST", "Malformed request"),
            ApiError::UnsupportedMediaType(_) => {
                ("UNSUPPORTED_MEDIA_TYPE", "Requested media type is not supported")
            }
            ApiError::NotFound(_) => ("NOT_FOUND", "Resource not found"),
            ApiError::Internal(_) => ("INTERNAL_ERROR", "Internal server error"),
        };

        let body = ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<NegotiationError> for ApiError {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::Malformed(_) => ApiError::BadRequest(err.to_string()),
            NegotiationError::ParamsUnsupported | NegotiationError::Unsupported(_) => {
                ApiError::UnsupportedMediaType(err.to_string())
            }
        }
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<claimy_core::TokenError> for ApiError {
    fn from(err: claimy_core::TokenError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
