//! Response rendering for dispatch results.
//!
//! # Responsibilities
//! - Render API and page results as JSON
//! - Map dispatch errors to HTTP status codes with a JSON error body
//!
//! # Design Decisions
//! - A page whose loaders partly failed is still 200; each slot carries
//!   its own error
//! - 405 responses list the allowed methods in the `Allow` header

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::dispatch::{ApiResponse, DispatchError, PageResponse};

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };
        let mut response = (status, Json(body)).into_response();

        if let DispatchError::MethodNotAllowed { allowed, .. } = &self {
            let allow = allowed
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let err = DispatchError::MethodNotAllowed {
            method: Method::DELETE,
            pattern: "/api/users".into(),
            allowed: vec![Method::GET, Method::POST],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn test_not_found_status() {
        let response = DispatchError::NotFound { path: "/x".into() }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::ALLOW).is_none());
    }
}
