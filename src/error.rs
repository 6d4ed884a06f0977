//! Request-level error taxonomy
//!
//! Handlers fail fast with an [`ApiError`]; the router converts it into a JSON
//! body `{"error": <message>, "success": false}` with the matching status.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW};
use hyper::{Method, Response, StatusCode};
use thiserror::Error;

use crate::http;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Required field missing or empty
    #[error("{0}")]
    Validation(String),

    /// Body is not the JSON the endpoint expects
    #[error("malformed JSON body: {0}")]
    MalformedBody(String),

    /// Body could not be read off the connection
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// Known path, unsupported verb
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        method: Method,
        allowed: &'static str,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub const fn method_not_allowed(method: Method, allowed: &'static str) -> Self {
        Self::MethodNotAllowed { method, allowed }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedBody(_) | Self::BodyRead(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "error": self.to_string(),
            "success": false,
        });
        let mut response = http::json_response(self.status(), &body);

        if let Self::MethodNotAllowed { allowed, .. } = self {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allowed));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::validation("content is required"), 400)]
    #[case(ApiError::MalformedBody("expected value".to_string()), 400)]
    #[case(ApiError::PayloadTooLarge { limit: 10 }, 413)]
    #[case(ApiError::method_not_allowed(Method::PUT, "POST"), 405)]
    #[case(ApiError::NotFound("/nope".to_string()), 404)]
    #[case(ApiError::Store(StoreError::Contention { key: "k".to_string(), attempts: 3 }), 500)]
    fn test_status_mapping(#[case] error: ApiError, #[case] status: u16) {
        assert_eq!(error.status().as_u16(), status);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::validation("message is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": "message is required", "success": false})
        );
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = ApiError::method_not_allowed(Method::DELETE, "GET, POST").into_response();
        assert_eq!(response.headers()[ALLOW], "GET, POST");
    }

    #[test]
    fn test_store_error_message_is_surfaced() {
        let error = ApiError::from(StoreError::Contention {
            key: "forum_posts:seq".to_string(),
            attempts: 16,
        });
        assert!(error.to_string().contains("forum_posts:seq"));
    }
}
