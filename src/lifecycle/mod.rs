//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Build dispatcher → Bind
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → stop accepting → drain in-flight requests → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - In-flight requests keep their own deadlines while draining

pub mod shutdown;

pub use shutdown::Shutdown;
