//! Module binding and gradual type checking for ink.

pub mod binding;
pub mod check;
pub mod diagnostics;
pub mod signature;
pub mod types;

pub use binding::*;
pub use check::*;
pub use types::*;
