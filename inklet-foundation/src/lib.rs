//! Foundational types for the inklet compiler.

pub mod errors;
pub mod source;
pub mod span;
