//! Request handler module
//!
//! Routing dispatch plus one handler per resource prefix. Handlers return
//! `Result<Response, ApiError>`; the router owns the single error boundary.

pub mod announcement;
pub mod forum;
pub mod router;
pub mod static_files;
pub mod submission;

pub use router::handle_request;

use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Version};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

use crate::error::ApiError;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub version: Version,
    pub headers: HeaderMap,
    /// Fully buffered body, empty until the size check passed
    pub body: Bytes,
    pub peer_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn from_parts(parts: hyper::http::request::Parts, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(ToString::to_string),
            method: parts.method,
            version: parts.version,
            headers: parts.headers,
            body: Bytes::new(),
            peer_addr,
        }
    }

    /// Header value as text, `None` when absent or not visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::MalformedBody(e.to_string()))
    }

    /// Caller address: `CF-Connecting-IP`, then the first `X-Forwarded-For`
    /// hop, then the TCP peer
    pub fn origin_ip(&self) -> Option<String> {
        let forwarded = || {
            self.header("x-forwarded-for")
                .and_then(|list| list.split(',').next())
                .map(str::trim)
        };

        self.header("cf-connecting-ip")
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .or_else(|| forwarded().filter(|ip| !ip.is_empty()))
            .map(ToString::to_string)
            .or_else(|| self.peer_addr.map(|addr| addr.ip().to_string()))
    }
}
