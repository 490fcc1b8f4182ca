//! HTTP-facing error type.
//!
//! Handlers return `Result<ApiResponse, ApiError>`; the router turns an
//! `ApiError` into a `{"message": ...}` JSON response with the mapped status.

use crate::auth::error::AuthError;
use crate::response::ApiResponse;
use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Not found")]
    NotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Message returned to the client.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.public_message(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::PayloadTooLarge => "request body too large".to_string(),
            ApiError::NotFound => "not found".to_string(),
        }
    }
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(error = %err, "request rejected");
        }
        ApiResponse::message(status, &err.public_message())
    }
}
