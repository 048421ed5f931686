//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate pattern markers and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{single_char, ServerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("matcher.{field} must be exactly one character, got {value:?}")]
    Marker { field: &'static str, value: String },

    #[error("matcher.index_segment must be non-empty and contain no '/'")]
    IndexSegment,

    #[error("dispatch.api_prefix must start with '/', got {0:?}")]
    ApiPrefix(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Check a configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let matcher = &config.matcher;
    for (field, value) in [("dynamic_prefix", &matcher.dynamic_prefix), ("splat", &matcher.splat)] {
        if !matches!(single_char(value), Some(c) if c != '/') {
            errors.push(ValidationError::Marker {
                field,
                value: value.clone(),
            });
        }
    }
    if matcher.index_segment.is_empty() || matcher.index_segment.contains('/') {
        errors.push(ValidationError::IndexSegment);
    }

    if !config.dispatch.api_prefix.starts_with('/') {
        errors.push(ValidationError::ApiPrefix(config.dispatch.api_prefix.clone()));
    }
    if config.dispatch.request_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("dispatch.request_timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
