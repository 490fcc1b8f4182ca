//! Response module - Helpers for creating responses.
//!
//! This module provides the `ApiResponse` builder used by handlers, the
//! router and the error types.

use hyper::{Body, Response as HyperResponse, StatusCode};
use serde::Serialize;

/// Response wrapper with helpers.
pub struct ApiResponse {
    status: StatusCode,
    body: Body,
    headers: Vec<(String, String)>,
}

impl ApiResponse {
    /// Create a new response.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: Body::empty(),
            headers: Vec::new(),
        }
    }

    /// JSON body of the form `{"message": ...}`.
    pub fn message(status: StatusCode, message: &str) -> Self {
        Self::new(status).json(&serde_json::json!({ "message": message }))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set JSON response.
    pub fn json<T: Serialize>(mut self, data: &T) -> Self {
        let json = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response body");
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
                r#"{"message":"internal server error"}"#.to_string()
            }
        };
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Body::from(json);
        self
    }

    /// Add a header.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }
}

impl From<ApiResponse> for HyperResponse<Body> {
    fn from(resp: ApiResponse) -> Self {
        let mut builder = HyperResponse::builder().status(resp.status);
        for (key, value) in resp.headers {
            builder = builder.header(key, value);
        }
        match builder.body(resp.body) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "invalid response header");
                let mut fallback = HyperResponse::new(Body::empty());
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_response() {
        let resp = ApiResponse::new(StatusCode::OK);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers.len(), 0);
    }

    #[test]
    fn test_json_response() {
        let data = json!({"message": "hello"});
        let resp = ApiResponse::new(StatusCode::OK).json(&data);
        assert_eq!(
            resp.headers[0],
            ("Content-Type".to_string(), "application/json".to_string())
        );

        let hyper_resp: HyperResponse<Body> = resp.into();
        assert_eq!(hyper_resp.status(), StatusCode::OK);
        assert_eq!(
            hyper_resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_message_body() {
        let resp: HyperResponse<Body> = ApiResponse::message(StatusCode::UNAUTHORIZED, "not authenticated").into();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(&bytes[..], br#"{"message":"not authenticated"}"#);
    }

    #[test]
    fn test_invalid_header_falls_back_to_500() {
        let resp: HyperResponse<Body> = ApiResponse::new(StatusCode::OK)
            .header("bad header\n", "value")
            .into();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
