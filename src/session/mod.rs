//! Session data model

pub mod types;

pub use types::*;
