//! Nested route matching and request-scoped task execution.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod tasks;

pub use config::schema::ServerConfig;
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Match, Matcher, MatcherOptions, NestedMatches};
pub use tasks::{Ctx, TaskGraph, TaskHandle};
