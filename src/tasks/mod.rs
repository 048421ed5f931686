//! Request-scoped task execution.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     TaskGraph::register(prerequisites, body) → TaskHandle<O>
//!     (prerequisites are handles of earlier tasks: the graph is a DAG)
//!     → Arc<TaskGraph>, read-only from here on
//!
//! Per request:
//!     Ctx::builder(graph).request(..).timeout(..).build()
//!     → handle.get(&ctx) / ctx.run_many(&[..])
//!     → each task body runs at most once per Ctx, prerequisites in parallel
//!     → Ctx dropped with the request
//! ```
//!
//! # Design Decisions
//! - Bodies are stored type-erased; the typed handle performs the single
//!   downcast back to the caller's output type
//! - A failing task only fails itself and its dependents
//! - Cancellation and deadline errors are distinct from body failures

pub mod ctx;
pub mod error;
pub mod graph;

pub use ctx::{Ctx, CtxBuilder};
pub use error::{BoxError, Interruption, SharedError, TaskError};
pub use graph::{TaskGraph, TaskHandle, TaskId, TaskRef};
