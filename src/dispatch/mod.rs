//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! API request (method, path)
//!     → routing best match → (pattern, method) handler
//!     → Ctx: middleware + route prerequisites (tasks, concurrent)
//!     → handler → ApiResponse | DispatchError
//!
//! Page request (path)
//!     → routing nested matches → one loader per match
//!     → Ctx: middleware (tasks), then every loader concurrently
//!     → PageResponse (each slot carries its own data or error)
//! ```
//!
//! # Design Decisions
//! - One Ctx per request; loaders of the same page share it, so a task
//!   they all depend on runs once
//! - Middleware failure fails the whole request; a loader failure only
//!   fails its own slot
//! - Handlers and loaders are spawned and raced against the Ctx
//!   interruption, like task bodies

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod handler;

pub use builder::DispatcherBuilder;
pub use dispatcher::{ApiResponse, Dispatcher, LoaderSlot, PageResponse};
pub use error::DispatchError;
pub use handler::{HandlerResult, RouteCtx};
