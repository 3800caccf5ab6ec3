//! Ruby extraction: turning a template into standalone Ruby for an external
//! tool and carrying the tool's corrections back.
//!
//! A [`Coordinator`] runs one session per document:
//!
//! 1. choose marker and output tokens that do not collide with the template;
//! 2. walk the node tree into [`Chunk`]s ([`ChunkExtractor`]);
//! 3. fuse adjacent compatible chunks and assemble the Ruby source, with
//!    markers around every chunk and a line-level source map;
//! 4. after the tool ran, check that its output kept every marker in order
//!    and transfer each chunk's corrections in reverse order.

pub mod chunk;
pub mod chunk_extractor;
pub mod coordinator;
pub mod error;
pub mod line_edit;
pub mod locate;
pub mod prefix;
pub mod ruby_source;
pub mod script_syntax;

pub use chunk::{Chunk, ChunkKind, CorrectedChunk, ScriptData, ScriptPiece};
pub use chunk_extractor::ChunkExtractor;
pub use coordinator::{Coordinator, SessionState, fuse_chunks};
pub use error::{ExtractionError, ExtractionResult};
pub use line_edit::LineEdit;
pub use prefix::{FixedSuffixes, Prefixes, RandomSuffix, SuffixSource};
pub use ruby_source::RubySource;

use serde::{Deserialize, Serialize};

/// The `[extraction]` section of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionOptions {
    /// Suffixes tried per token before giving up on a collision-free prefix.
    pub max_prefix_attempts: usize,
    /// Filters whose body is plain Ruby.
    pub code_filters: Vec<String>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_prefix_attempts: prefix::DEFAULT_MAX_PREFIX_ATTEMPTS,
            code_filters: vec!["ruby".to_string()],
        }
    }
}
