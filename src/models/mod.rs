//! Persisted entity layouts owned by this backend.

pub mod outfit;

pub use outfit::{Outfit, OutfitError};
