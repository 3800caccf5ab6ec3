//! Shared helpers.

pub mod indentation;
