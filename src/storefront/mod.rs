//! Storefront edge subsystem.
//!
//! # Data Flow
//! ```text
//! Browser → /api/* → rewrite.rs (map to backend URL)
//!                  → proxy.rs (forward with hyper client)
//!                  → backend
//!
//! Image URLs → images.rs (host allow-list)
//! ```

pub mod images;
pub mod proxy;
pub mod rewrite;

pub use images::ImagePolicy;
pub use proxy::{router, ProxyError};
pub use rewrite::RewriteRule;
