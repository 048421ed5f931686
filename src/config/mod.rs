//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → matcher options, dispatch deadline, listener, observability
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart, since
//!   the route table is frozen at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, override_bind, parse_config, ConfigError};
pub use schema::{
    DispatchConfig, ListenerConfig, MatcherConfig, ObservabilityConfig, ServerConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
