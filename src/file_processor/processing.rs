//! Linting and fixing a single template.

use crate::ruby_extraction::ExtractionError;
use crate::ruby_tool::{ProcessorError, RubyToolProcessor};
use crate::template::parse;
use crate::warning::LintWarning;
use std::fs;
use std::time::Instant;

/// What happened to one file.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub path: String,
    /// Offenses left after any fixing.
    pub warnings: Vec<LintWarning>,
    /// Whether corrections were written back.
    pub fixed: bool,
    /// Set when the file could not be processed.
    pub error: Option<String>,
}

impl FileOutcome {
    fn failed(path: &str, error: String) -> Self {
        Self {
            path: path.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Read, optionally autocorrect, and lint the template at `path`.
pub fn process_file(path: &str, processor: &RubyToolProcessor<'_>, fix: bool) -> FileOutcome {
    let start = Instant::now();

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return FileOutcome::failed(path, format!("Failed to read file: {e}")),
    };

    let (content, fixed) = if fix {
        match fix_content(path, &content, processor) {
            Ok(Some(corrected)) => {
                if let Err(e) = fs::write(path, &corrected) {
                    return FileOutcome::failed(path, format!("Failed to write file: {e}"));
                }
                log::info!("{path}: corrections applied");
                (corrected, true)
            }
            Ok(None) => (content, false),
            Err(e) => return FileOutcome::failed(path, e),
        }
    } else {
        (content, false)
    };

    let outcome = match lint_content(path, &content, processor) {
        Ok(warnings) => FileOutcome {
            path: path.to_string(),
            warnings,
            fixed,
            error: None,
        },
        Err(e) => FileOutcome {
            fixed,
            ..FileOutcome::failed(path, e)
        },
    };

    log::debug!("{path} processed in {:?}", start.elapsed());
    outcome
}

/// Lint template content. Errors are rendered for display.
pub fn lint_content(path: &str, content: &str, processor: &RubyToolProcessor<'_>) -> Result<Vec<LintWarning>, String> {
    let template = parse(content).map_err(|e| format!("Failed to parse template: {e}"))?;
    processor.lint(&template, path).map_err(|e| e.to_string())
}

/// Autocorrect template content. `None` when nothing changed.
pub fn fix_content(path: &str, content: &str, processor: &RubyToolProcessor<'_>) -> Result<Option<String>, String> {
    let template = parse(content).map_err(|e| format!("Failed to parse template: {e}"))?;
    match processor.autocorrect(&template, path) {
        Ok(outcome) if outcome.changed => Ok(Some(outcome.content)),
        Ok(_) => Ok(None),
        Err(ProcessorError::Extraction(e @ ExtractionError::MarkerConflict { .. })) => {
            log::warn!("{path}: corrections not applied: {e}");
            Ok(None)
        }
        Err(e) => Err(e.to_string()),
    }
}
