//! hamlint: lint and autocorrect the Ruby embedded in HAML templates with an
//! external Ruby tool such as RuboCop.
//!
//! The pipeline per template is:
//!
//! 1. [`template::parse`] builds the node tree;
//! 2. [`ruby_extraction::Coordinator`] turns it into standalone Ruby with
//!    markers and a source map;
//! 3. [`ruby_tool::RubyToolProcessor`] runs the tool on that Ruby and maps
//!    offenses and corrections back onto the template.

pub mod config;
pub mod exit_codes;
pub mod file_processor;
pub mod output;
pub mod parallel;
pub mod ruby_extraction;
pub mod ruby_tool;
pub mod template;
pub mod utils;
pub mod warning;

pub use crate::ruby_extraction::{Coordinator, ExtractionError, ExtractionOptions};
pub use crate::template::{ParseError, ParsedTemplate, parse};
pub use crate::warning::{LintWarning, Severity};
