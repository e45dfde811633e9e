//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits, lifecycle checks)
//!     → connection.rs (in-flight tracking)
//!     → hyper connection serving the application router
//!
//! Listener States:
//!     Starting → Accepting → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Draining connections finish their current request, then close

pub mod connection;
pub mod listener;

pub use listener::{ListenerError, ListenerHandle};
