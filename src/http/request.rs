//! Request metadata handed to tasks, handlers and loaders.
//!
//! # Responsibilities
//! - Capture method, path, headers and request ID from the transport
//! - Stay independent of the request body, which the core never reads

use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The parts of an inbound request visible to the dispatch core.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
        }
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("unknown")
    }
}
