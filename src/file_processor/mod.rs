//! File discovery and per-file linting/fixing.

mod discovery;
mod processing;

pub use discovery::*;
pub use processing::*;
