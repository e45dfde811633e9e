//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → hyper auto (HTTP/1.1 or HTTP/2)
//!     → server.rs (request id, trace, timeout layers)
//!     → application routes (app::Container)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::build_router;
