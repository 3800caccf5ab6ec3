//! The generated Ruby source and its marker bookkeeping.

use super::chunk::Chunk;
use std::collections::BTreeMap;

pub const MARKER_NAME: &str = "marker";
pub const PLACEHOLDER_NAME: &str = "placeholder";

/// Ruby generated from one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubySource {
    pub source: String,
    /// 1-based generated line → 0-based template line.
    pub source_map: BTreeMap<usize, usize>,
    pub chunks: Vec<Chunk>,
}

impl RubySource {
    pub fn line_count(&self) -> usize {
        self.source_map.len()
    }

    /// Template line index for a generated line, falling back to the nearest
    /// preceding mapped line.
    pub fn template_line_index(&self, generated_line: usize) -> Option<usize> {
        self.source_map
            .range(..=generated_line)
            .next_back()
            .or_else(|| self.source_map.iter().next())
            .map(|(_, template_line)| *template_line)
    }
}

pub fn marker_token(prefix: &str, name: &str, generated_line: usize) -> String {
    format!("{prefix}_{name}_{generated_line}")
}

/// Accumulates generated lines and their source map entries.
pub struct SourceBuilder {
    marker_prefix: String,
    lines: Vec<String>,
    source_map: BTreeMap<usize, usize>,
    last_template_index: usize,
}

impl SourceBuilder {
    pub fn new(marker_prefix: &str, template_line_count: usize) -> Self {
        Self {
            marker_prefix: marker_prefix.to_string(),
            lines: Vec::new(),
            source_map: BTreeMap::new(),
            last_template_index: template_line_count.saturating_sub(1),
        }
    }

    /// Append a line; returns its 1-based generated line number.
    pub fn add_line(&mut self, line: String, template_index: usize) -> usize {
        self.lines.push(line);
        let generated = self.lines.len();
        self.source_map
            .insert(generated, template_index.min(self.last_template_index));
        generated
    }

    /// Append a marker line whose token embeds its own line number.
    pub fn add_marker(&mut self, indent: usize, name: &str, template_index: usize) -> usize {
        let generated = self.lines.len() + 1;
        let token = marker_token(&self.marker_prefix, name, generated);
        self.add_line(format!("{}{token}", " ".repeat(indent)), template_index)
    }

    pub fn finish(self, chunks: Vec<Chunk>) -> RubySource {
        let mut source = self.lines.join("\n");
        if !source.is_empty() {
            source.push('\n');
        }
        RubySource {
            source,
            source_map: self.source_map,
            chunks,
        }
    }
}

/// Source text returned by the external tool, split into lines.
pub struct CorrectedSource {
    lines: Vec<String>,
}

impl CorrectedSource {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 0-based index of the line ending with `token`. The line the marker was
    /// generated on is checked first.
    pub fn find_marker(&self, token: &str, expected_line: usize) -> Option<usize> {
        let expected = expected_line.checked_sub(1);
        if let Some(idx) = expected
            && self.lines.get(idx).is_some_and(|line| ends_with_token(line, token))
        {
            return Some(idx);
        }
        self.lines.iter().position(|line| ends_with_token(line, token))
    }

    /// Lines strictly between two marker indexes.
    pub fn between(&self, start: usize, end: usize) -> &[String] {
        if end <= start + 1 || end > self.lines.len() {
            return &[];
        }
        &self.lines[start + 1..end]
    }
}

fn ends_with_token(line: &str, token: &str) -> bool {
    line.trim_end()
        .strip_suffix(token)
        .is_some_and(|before| before.chars().last().is_none_or(|c| !(c.is_alphanumeric() || c == '_')))
}
