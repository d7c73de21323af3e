//! Business logic handlers
//!
//! These handlers contain the session lifecycle logic used by the HTTP API.

pub mod sessions;

// Re-export commonly used types
pub use sessions::*;
