//! Request and response payloads

pub mod prediction;

pub use prediction::*;
