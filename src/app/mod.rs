//! Application container subsystem.
//!
//! The process does not implement business routes itself; it asks an
//! [`ApplicationLoader`] to register them and serves the result.

pub mod loader;

pub use loader::{ApplicationLoader, Container, DirectoryLoader, LoaderError};
