use super::coordinator::SessionState;
use thiserror::Error;

/// Document-scoped failures of the extraction pipeline.
///
/// Spans whose raw source cannot be located are not errors: they are left
/// out of the generated source and logged at debug level.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no collision-free marker prefix found after {attempts} attempts")]
    PrefixCollisionExhausted { attempts: usize },

    #[error("the corrected source no longer has the original chunk markers ({expected} expected, {found} found); corrections were not applied")]
    MarkerConflict { expected: usize, found: usize },

    #[error("line {line}: `{code}` opens a block but has nothing nested under it")]
    UnsupportedConstruct { line: usize, code: String },

    #[error("cannot {operation} while the session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;
