//! Exit codes for hamlint.
//!
//! These let CI systems tell lint findings apart from tool failures.

/// No issues found, or all issues were fixed
pub const SUCCESS: i32 = 0;

/// One or more offenses reported by the Ruby tool
pub const VIOLATIONS_FOUND: i32 = 1;

/// Configuration error, unreadable or unparsable template, or tool failure
pub const TOOL_ERROR: i32 = 2;

pub mod exit {
    use super::{SUCCESS, TOOL_ERROR, VIOLATIONS_FOUND};

    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    pub fn violations_found() -> ! {
        std::process::exit(VIOLATIONS_FOUND);
    }

    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
