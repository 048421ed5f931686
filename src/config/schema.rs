//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::MatcherOptions;

/// Root configuration for the dispatch server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Pattern syntax markers.
    pub matcher: MatcherConfig,

    /// Request dispatch settings.
    pub dispatch: DispatchConfig,

    /// HTTP timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Markers used when parsing route patterns.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Literal segment marking an index route.
    pub index_segment: String,

    /// Prefix of a dynamic segment.
    pub dynamic_prefix: String,

    /// Lone splat segment.
    pub splat: String,

    /// Pattern segments starting with this prefix are skipped.
    pub excluded_prefix: Option<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            index_segment: "_index".to_string(),
            dynamic_prefix: ":".to_string(),
            splat: "*".to_string(),
            excluded_prefix: None,
        }
    }
}

impl MatcherConfig {
    /// Convert to matcher options. Falls back to the default marker for a
    /// field that is not exactly one character; validation reports those.
    pub fn to_options(&self) -> MatcherOptions {
        let defaults = MatcherOptions::default();
        let options = MatcherOptions {
            index_segment: self.index_segment.clone(),
            dynamic_prefix: single_char(&self.dynamic_prefix).unwrap_or(defaults.dynamic_prefix),
            splat: single_char(&self.splat).unwrap_or(defaults.splat),
            exclude: None,
        };
        match &self.excluded_prefix {
            Some(prefix) if !prefix.is_empty() => options.exclude_prefix(prefix.clone()),
            _ => options,
        }
    }
}

pub(crate) fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Paths under this prefix are API requests; all others are pages.
    pub api_prefix: String,

    /// Deadline for each request context in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Timeout configuration for the HTTP layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [matcher]
            splat = "$"
            excluded_prefix = "__"

            [dispatch]
            request_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.matcher.index_segment, "_index");
        assert_eq!(config.dispatch.api_prefix, "/api");
        assert_eq!(config.dispatch.request_timeout_ms, 250);

        let options = config.matcher.to_options();
        assert_eq!(options.splat, '$');
        assert_eq!(options.dynamic_prefix, ':');
        assert!(options.exclude.is_some());
    }

    #[test]
    fn test_single_char() {
        assert_eq!(single_char("*"), Some('*'));
        assert_eq!(single_char(""), None);
        assert_eq!(single_char("**"), None);
    }
}
