//! One extraction session per template.
//!
//! The coordinator drives the pipeline from node tree to generated Ruby and,
//! after the external tool has run, carries its corrections back onto the
//! template lines. A session is used for a single document and never shared.

use super::ExtractionOptions;
use super::chunk::{Chunk, CorrectedChunk};
use super::chunk_extractor::ChunkExtractor;
use super::error::{ExtractionError, ExtractionResult};
use super::prefix::{Prefixes, SuffixSource, choose_prefixes};
use super::ruby_source::{CorrectedSource, MARKER_NAME, PLACEHOLDER_NAME, RubySource, SourceBuilder, marker_token};
use crate::template::ParsedTemplate;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Extracting,
    Fusing,
    Assembling,
    AwaitingExternalResult,
    TransferringCorrections,
    Done,
    Aborted,
}

pub struct Coordinator<'t> {
    template: &'t ParsedTemplate,
    options: ExtractionOptions,
    /// Template lines; an empty template is treated as one empty line.
    lines: Vec<String>,
    state: SessionState,
    prefixes: Option<Prefixes>,
    ruby_source: Option<RubySource>,
}

impl<'t> Coordinator<'t> {
    pub fn new(template: &'t ParsedTemplate, options: ExtractionOptions) -> Self {
        let lines = if template.lines.is_empty() {
            vec![String::new()]
        } else {
            template.lines.clone()
        };
        Self {
            template,
            options,
            lines,
            state: SessionState::Idle,
            prefixes: None,
            ruby_source: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn prefixes(&self) -> Option<&Prefixes> {
        self.prefixes.as_ref()
    }

    /// Generate the Ruby source for the template.
    pub fn extract_ruby_source(&mut self, suffixes: &mut dyn SuffixSource) -> ExtractionResult<RubySource> {
        if self.state != SessionState::Idle {
            return Err(ExtractionError::InvalidState {
                operation: "extract Ruby source",
                state: self.state,
            });
        }

        self.state = SessionState::Extracting;
        let prefixes = match choose_prefixes(&self.template.source, self.options.max_prefix_attempts, suffixes) {
            Ok(prefixes) => prefixes,
            Err(err) => {
                self.state = SessionState::Aborted;
                return Err(err);
            }
        };
        let chunks = match ChunkExtractor::new(self.template, &self.lines, &self.options, &prefixes).extract() {
            Ok(chunks) => chunks,
            Err(err) => {
                self.state = SessionState::Aborted;
                return Err(err);
            }
        };

        self.state = SessionState::Fusing;
        let raw_count = chunks.len();
        let mut chunks = fuse_chunks(chunks, &self.lines);

        self.state = SessionState::Assembling;
        let mut builder = SourceBuilder::new(&prefixes.marker, self.lines.len());
        for chunk in &mut chunks {
            chunk.assemble(&mut builder);
        }
        let source = builder.finish(chunks);
        log::debug!(
            "extracted {raw_count} chunks ({} after fusion), {} lines of Ruby",
            source.chunks.len(),
            source.line_count()
        );

        self.prefixes = Some(prefixes);
        self.ruby_source = Some(source.clone());
        self.state = SessionState::AwaitingExternalResult;
        Ok(source)
    }

    /// Map `(generated line, message)` findings to 1-based template lines.
    pub fn map_findings(&self, findings: &[(usize, String)]) -> Vec<(usize, String)> {
        findings
            .iter()
            .map(|(line, message)| {
                let template_line = self
                    .ruby_source
                    .as_ref()
                    .and_then(|source| source.template_line_index(*line))
                    .map_or(1, |idx| idx + 1);
                (template_line, message.clone())
            })
            .collect()
    }

    /// Whether a generated line (1-based) only carries a marker. Findings on
    /// such lines concern the scaffolding, not the template.
    pub fn is_marker_line(&self, line: usize) -> bool {
        let (Some(source), Some(prefixes)) = (&self.ruby_source, &self.prefixes) else {
            return false;
        };
        line.checked_sub(1)
            .and_then(|idx| source.source.lines().nth(idx))
            .and_then(|text| trailing_marker(text, &prefixes.marker).map(|token| text.trim() == token))
            .unwrap_or(false)
    }

    /// Carry the tool's corrected source back onto the template lines.
    ///
    /// Fails with [`ExtractionError::MarkerConflict`] when the markers of the
    /// corrected source differ from the generated ones; nothing is changed in
    /// that case.
    pub fn template_lines_with_corrections_applied(&mut self, corrected: &str) -> ExtractionResult<Vec<String>> {
        let (Some(source), Some(prefixes)) = (&self.ruby_source, &self.prefixes) else {
            return Err(ExtractionError::InvalidState {
                operation: "transfer corrections",
                state: self.state,
            });
        };
        if self.state != SessionState::AwaitingExternalResult {
            return Err(ExtractionError::InvalidState {
                operation: "transfer corrections",
                state: self.state,
            });
        }

        let corrected = CorrectedSource::new(corrected);
        let expected = marker_sequence(source.source.lines(), &prefixes.marker);
        let found = marker_sequence(corrected.lines().iter().map(String::as_str), &prefixes.marker);
        if expected != found {
            log::debug!(
                "marker sequence changed ({} generated, {} returned); corrections dropped",
                expected.len(),
                found.len()
            );
            self.state = SessionState::Aborted;
            return Err(ExtractionError::MarkerConflict {
                expected: expected.len(),
                found: found.len(),
            });
        }

        self.state = SessionState::TransferringCorrections;
        let mut lines = self.template.lines.clone();
        for chunk in source.chunks.iter().rev() {
            transfer_chunk(chunk, &corrected, prefixes, &mut lines);
        }

        self.state = SessionState::Done;
        Ok(lines)
    }
}

/// Single left-to-right pass; each chunk is tried against the already
/// fused previous one.
pub fn fuse_chunks(chunks: Vec<Chunk>, template_lines: &[String]) -> Vec<Chunk> {
    let mut fused: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if let Some(previous) = fused.last_mut()
            && let Some(merged) = previous.fuse(&chunk, template_lines)
        {
            *previous = merged;
            continue;
        }
        fused.push(chunk);
    }
    fused
}

fn transfer_chunk(chunk: &Chunk, corrected: &CorrectedSource, prefixes: &Prefixes, lines: &mut Vec<String>) {
    let (Some(name), Some(start), Some(end)) = (chunk.marker_name(), chunk.start_marker_line, chunk.end_marker_line)
    else {
        return;
    };

    let Some(start_idx) = corrected.find_marker(&marker_token(&prefixes.marker, name, start), start) else {
        return;
    };
    let span = if start == end {
        &[][..]
    } else {
        match corrected.find_marker(&marker_token(&prefixes.marker, name, end), end) {
            Some(end_idx) => corrected.between(start_idx, end_idx),
            None => return,
        }
    };

    let corrected_chunk = CorrectedChunk {
        marker_line: &corrected.lines()[start_idx],
        lines: span,
        output_prefix: &prefixes.output,
    };
    if let Some(edit) = chunk.transfer(&corrected_chunk, lines) {
        edit.apply(lines);
    }
}

/// Marker tokens found at the end of lines, in order.
fn marker_sequence<'s>(lines: impl Iterator<Item = &'s str>, prefix: &str) -> Vec<&'s str> {
    lines.filter_map(|line| trailing_marker(line, prefix)).collect()
}

fn trailing_marker<'s>(line: &'s str, prefix: &str) -> Option<&'s str> {
    let line = line.trim_end();
    let start = line
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(0, |(idx, c)| idx + c.len_utf8());
    let token = &line[start..];

    let rest = token.strip_prefix(prefix)?.strip_prefix('_')?;
    let number = rest
        .strip_prefix(MARKER_NAME)
        .or_else(|| rest.strip_prefix(PLACEHOLDER_NAME))?
        .strip_prefix('_')?;
    (!number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruby_extraction::prefix::FixedSuffixes;
    use crate::template::parse;

    fn generated(source: &str) -> String {
        let template = parse(source).unwrap();
        let mut coordinator = Coordinator::new(&template, ExtractionOptions::default());
        coordinator
            .extract_ruby_source(&mut FixedSuffixes::new(["x"]))
            .unwrap()
            .source
    }

    #[test]
    fn test_conditional_source() {
        let ruby = generated("- if a\n  abc\n");
        assert_eq!(
            ruby,
            "haml_lint_marker_1\nif a\n  haml_lint_marker_3\n  haml_lint_placeholder_4\nend\n"
        );
    }

    #[test]
    fn test_state_transitions() {
        let template = parse("- a = 1\n").unwrap();
        let mut coordinator = Coordinator::new(&template, ExtractionOptions::default());
        assert_eq!(coordinator.state(), SessionState::Idle);
        assert!(matches!(
            coordinator.template_lines_with_corrections_applied(""),
            Err(ExtractionError::InvalidState { .. })
        ));

        let ruby = coordinator.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();
        assert_eq!(coordinator.state(), SessionState::AwaitingExternalResult);
        assert!(coordinator.extract_ruby_source(&mut FixedSuffixes::new(["x"])).is_err());

        let lines = coordinator.template_lines_with_corrections_applied(&ruby.source).unwrap();
        assert_eq!(lines, template.lines);
        assert_eq!(coordinator.state(), SessionState::Done);
    }

    #[test]
    fn test_map_findings() {
        let template = parse("%p\n  = foo\n").unwrap();
        let mut coordinator = Coordinator::new(&template, ExtractionOptions::default());
        let ruby = coordinator.extract_ruby_source(&mut FixedSuffixes::new(["x"])).unwrap();
        let line = ruby
            .source
            .lines()
            .position(|line| line.contains("HL.out = foo"))
            .unwrap()
            + 1;
        let mapped = coordinator.map_findings(&[(line, "bad".to_string())]);
        assert_eq!(mapped, vec![(2, "bad".to_string())]);
        assert!(!coordinator.is_marker_line(line));
        assert!(coordinator.is_marker_line(line - 1));
    }

    #[test]
    fn test_trailing_marker() {
        assert_eq!(trailing_marker("  hl_marker_12", "hl"), Some("hl_marker_12"));
        assert_eq!(trailing_marker("hl_placeholder_3  ", "hl"), Some("hl_placeholder_3"));
        assert_eq!(trailing_marker("if hl_tag", "hl"), None);
        assert_eq!(trailing_marker("xhl_marker_1", "hl"), None);
        assert_eq!(trailing_marker("hl_marker_", "hl"), None);
    }
}
