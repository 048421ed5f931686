//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → request.rs (RequestInfo: method, path, headers)
//!     → dispatch (API best match or page nested matches)
//!     → response.rs (JSON body, status mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestInfo, X_REQUEST_ID};
pub use response::ErrorBody;
pub use server::{AppState, HttpServer};
