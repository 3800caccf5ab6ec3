//! Linting and autocorrecting template Ruby with an external tool.
//!
//! The generated Ruby of a template is piped to the tool on stdin. In lint
//! mode its offenses are parsed from the output and relocated to template
//! lines; in fix mode the corrected source is read back from stdout and
//! transferred onto the template.
//!
//! # Configuration
//!
//! ```toml
//! [ruby-tool]
//! command = ["bundle", "exec", "rubocop"]
//! lint-args = ["--stdin", "{path}", "--format", "emacs"]
//! fix-args = ["--stdin", "{path}", "--autocorrect", "--stderr", "--format", "quiet"]
//! timeout = 30000          # ms per run, 0 disables the timeout
//! on-error = "fail"        # or "skip" / "warn"
//! success-exit-codes = [0, 1]
//! ```

pub mod config;
pub mod executor;
pub mod processor;

pub use config::{OnError, RubyToolConfig, ToolMode};
pub use executor::{ExecutorError, ToolExecutor, ToolOutput};
pub use processor::{AutocorrectOutcome, ProcessorError, RubyToolProcessor};
