//! Request module - Wrapper around hyper's Request.
//!
//! This module provides a Request type alias and the JSON body reader used
//! by handlers.

use crate::errors::ApiError;
use hyper::body::HttpBody;
use hyper::{header::CONTENT_LENGTH, Body, Request};
use serde::de::DeserializeOwned;

// Type alias for convenience
pub type ApiRequest = Request<Body>;

/// Largest request body accepted by `read_json`, in bytes.
pub const MAX_JSON_BODY: usize = 64 * 1024;

/// Buffer the body up to `MAX_JSON_BODY` bytes, then deserialize it as JSON.
///
/// A declared `Content-Length` above the limit is refused before any byte is
/// read. Otherwise chunks are collected until the running total passes the
/// limit, at which point the rest of the body is dropped unread.
pub async fn read_json<T: DeserializeOwned>(req: ApiRequest) -> Result<T, ApiError> {
    read_json_limited(req, MAX_JSON_BODY).await
}

async fn read_json_limited<T: DeserializeOwned>(req: ApiRequest, max_bytes: usize) -> Result<T, ApiError> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if matches!(declared, Some(len) if len > max_bytes as u64) {
        return Err(ApiError::PayloadTooLarge);
    }

    let mut body = req.into_body();
    let mut collected = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("failed to read request body: {}", e)))?;
        if collected.len() + chunk.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge);
        }
        collected.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&collected).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))
}
