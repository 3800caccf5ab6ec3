//! Chunks: runs of generated Ruby tied to one template region.
//!
//! Each variant knows how much of the external tool's corrections it can
//! safely carry back into the template. Chunks never mutate template lines
//! themselves; `transfer` returns a [`LineEdit`] computed against the
//! current lines.

use super::line_edit::LineEdit;
use super::locate::{RawSpan, locate};
use super::ruby_source::{MARKER_NAME, PLACEHOLDER_NAME, SourceBuilder};
use super::script_syntax::{block_opening, group_statements, is_explicit_close, is_mid_block_keyword};
use crate::template::ScriptToken;
use crate::utils::indentation::{indent_line, leading_spaces, reindent_to};

/// One unit of a script chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPiece {
    /// A statement, possibly spanning several lines. `token` is `None` for
    /// silent scripts.
    Statement {
        token: Option<ScriptToken>,
        ruby_len: usize,
        template_start: usize,
        template_len: usize,
    },
    /// Blank template line between two fused scripts.
    Blank { template_line: usize },
    /// Synthetic `end` or `}`.
    Close,
}

impl ScriptPiece {
    fn ruby_len(&self) -> usize {
        match self {
            ScriptPiece::Statement { ruby_len, .. } => *ruby_len,
            ScriptPiece::Blank { .. } | ScriptPiece::Close => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptData {
    pub pieces: Vec<ScriptPiece>,
    /// Block openers and `else`-like keywords never join a preceding chunk.
    pub must_start_chunk: bool,
    /// Ends with an opener whose branches follow as siblings
    /// (`- case x` followed by `- when 1`).
    pub awaits_branch: bool,
}

/// Variant of a chunk, with the payload its transfer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkKind {
    /// Template content with no Ruby; only its indentation is corrected.
    PlaceholderMarker { indent: usize, template_len: usize },
    Script(ScriptData),
    TagAttributes { span: RawSpan },
    TagScript { span: RawSpan },
    /// Plain text with `#{}` interpolation, linted as a string literal.
    /// `span` is the text as written in the template.
    InterpolatedText { span: RawSpan },
    Comment { indent: usize },
    /// Filter body wrapped in a squiggly heredoc.
    LiteralFilter { indent: usize, delimiter: String },
    /// `:ruby` filter body; `offset` is how far the body was dedented.
    CodeFilter { offset: usize },
    Filler,
    SyntheticClose,
}

impl ChunkKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChunkKind::PlaceholderMarker { .. } => "placeholder",
            ChunkKind::Script(_) => "script",
            ChunkKind::TagAttributes { .. } => "tag-attributes",
            ChunkKind::TagScript { .. } => "tag-script",
            ChunkKind::InterpolatedText { .. } => "interpolated-text",
            ChunkKind::Comment { .. } => "comment",
            ChunkKind::LiteralFilter { .. } => "literal-filter",
            ChunkKind::CodeFilter { .. } => "code-filter",
            ChunkKind::Filler => "filler",
            ChunkKind::SyntheticClose => "synthetic-close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Generated Ruby lines, markers excluded.
    pub lines: Vec<String>,
    /// Template line index of every entry in `lines`.
    pub line_map: Vec<usize>,
    /// 1-based line of the node the chunk came from.
    pub node_line: usize,
    pub template_line_index: usize,
    pub start_marker_indent: usize,
    pub end_marker_indent: Option<usize>,
    /// Generated line numbers of the markers, set by `assemble`.
    pub start_marker_line: Option<usize>,
    pub end_marker_line: Option<usize>,
}

/// The corrected Ruby belonging to one chunk.
pub struct CorrectedChunk<'a> {
    /// The chunk's start marker line (the only line for placeholders).
    pub marker_line: &'a str,
    /// Lines strictly between the start and end markers.
    pub lines: &'a [String],
    pub output_prefix: &'a str,
}

impl Chunk {
    pub fn new(kind: ChunkKind, node_line: usize, template_line_index: usize, lines: Vec<String>) -> Self {
        let line_map = vec![template_line_index; lines.len()];
        Self {
            kind,
            lines,
            line_map,
            node_line,
            template_line_index,
            start_marker_indent: 0,
            end_marker_indent: None,
            start_marker_line: None,
            end_marker_line: None,
        }
    }

    pub fn placeholder(node_line: usize, template_line_index: usize, indent: usize, template_len: usize) -> Self {
        let mut chunk = Self::new(
            ChunkKind::PlaceholderMarker { indent, template_len },
            node_line,
            template_line_index,
            Vec::new(),
        );
        chunk.start_marker_indent = indent;
        chunk
    }

    /// Give every line its own template line, starting at
    /// `template_line_index`.
    pub fn with_sequential_lines(mut self) -> Self {
        self.line_map = (0..self.lines.len()).map(|i| self.template_line_index + i).collect();
        self
    }

    pub fn with_markers(mut self, start_indent: usize, end_indent: usize) -> Self {
        self.start_marker_indent = start_indent;
        self.end_marker_indent = Some(end_indent);
        self
    }

    /// Lines of generated Ruby with no template counterpart.
    pub fn skipped_line_count(&self) -> usize {
        match &self.kind {
            ChunkKind::Script(data) => data
                .pieces
                .iter()
                .filter(|piece| matches!(piece, ScriptPiece::Close))
                .count(),
            ChunkKind::LiteralFilter { .. } => 2.min(self.lines.len()),
            ChunkKind::Filler | ChunkKind::SyntheticClose => self.lines.len(),
            _ => 0,
        }
    }

    /// Number of template lines the chunk covers, never less than one.
    pub fn template_line_count(&self) -> usize {
        match &self.kind {
            ChunkKind::PlaceholderMarker { template_len, .. } => *template_len,
            _ => self.lines.len().saturating_sub(self.skipped_line_count()).max(1),
        }
    }

    fn template_end(&self) -> usize {
        self.template_line_index + self.template_line_count()
    }

    /// Merge `next` into this chunk when both can be corrected as one unit.
    pub fn fuse(&self, next: &Chunk, template_lines: &[String]) -> Option<Chunk> {
        match (&self.kind, &next.kind) {
            (ChunkKind::Script(current), ChunkKind::Script(following)) => {
                self.fuse_scripts(current, next, following, template_lines)
            }
            (ChunkKind::Script(current), ChunkKind::SyntheticClose) => Some(self.fuse_close(current, next)),
            (ChunkKind::Comment { indent }, ChunkKind::Comment { indent: next_indent })
                if indent == next_indent && self.template_end() == next.template_line_index =>
            {
                let mut fused = self.clone();
                fused.lines.extend(next.lines.iter().cloned());
                fused.line_map.extend(next.line_map.iter().copied());
                Some(fused)
            }
            _ => None,
        }
    }

    fn fuse_scripts(
        &self,
        current: &ScriptData,
        next: &Chunk,
        following: &ScriptData,
        template_lines: &[String],
    ) -> Option<Chunk> {
        if following.must_start_chunk && !current.awaits_branch {
            return None;
        }

        let gap = self.template_end()..next.template_line_index;
        if gap.start > gap.end || !template_lines.get(gap.clone())?.iter().all(|line| line.trim().is_empty()) {
            return None;
        }

        let mut fused = self.clone();
        let mut pieces = current.pieces.clone();
        for template_line in gap {
            pieces.push(ScriptPiece::Blank { template_line });
            fused.lines.push(String::new());
            fused.line_map.push(template_line);
        }
        pieces.extend(following.pieces.iter().cloned());
        fused.lines.extend(next.lines.iter().cloned());
        fused.line_map.extend(next.line_map.iter().copied());
        fused.kind = ChunkKind::Script(ScriptData {
            pieces,
            must_start_chunk: current.must_start_chunk,
            awaits_branch: following.awaits_branch,
        });
        fused.end_marker_indent = next.end_marker_indent;
        Some(fused)
    }

    fn fuse_close(&self, current: &ScriptData, close: &Chunk) -> Chunk {
        let mut pieces = current.pieces.clone();
        let piece_index = pieces
            .iter()
            .rposition(|piece| !matches!(piece, ScriptPiece::Blank { .. }))
            .map_or(0, |idx| idx + 1);
        let line_index: usize = pieces[..piece_index].iter().map(ScriptPiece::ruby_len).sum();

        let mut fused = self.clone();
        let mapped = line_index
            .checked_sub(1)
            .and_then(|idx| fused.line_map.get(idx).copied())
            .unwrap_or(self.template_line_index);
        for (offset, line) in close.lines.iter().enumerate() {
            fused.lines.insert(line_index + offset, line.clone());
            fused.line_map.insert(line_index + offset, mapped);
            pieces.insert(piece_index + offset, ScriptPiece::Close);
        }

        fused.end_marker_indent = close.lines.first().map(|line| leading_spaces(line));
        fused.kind = ChunkKind::Script(ScriptData {
            pieces,
            must_start_chunk: current.must_start_chunk,
            awaits_branch: false,
        });
        fused
    }

    /// Emit this chunk, wrapped in markers as its variant requires.
    pub fn assemble(&mut self, builder: &mut SourceBuilder) {
        match self.kind {
            ChunkKind::Filler | ChunkKind::SyntheticClose => {
                for (line, template_index) in self.lines.iter().zip(&self.line_map) {
                    builder.add_line(line.clone(), *template_index);
                }
            }
            ChunkKind::PlaceholderMarker { indent, .. } => {
                let marker = builder.add_marker(indent, PLACEHOLDER_NAME, self.template_line_index);
                self.start_marker_line = Some(marker);
                self.end_marker_line = Some(marker);
            }
            _ => {
                let start = builder.add_marker(self.start_marker_indent, MARKER_NAME, self.template_line_index);
                for (line, template_index) in self.lines.iter().zip(&self.line_map) {
                    builder.add_line(line.clone(), *template_index);
                }
                let last = self.line_map.last().copied().unwrap_or(self.template_line_index);
                let end_indent = self.end_marker_indent.unwrap_or(self.start_marker_indent);
                let end = builder.add_marker(end_indent, MARKER_NAME, last);
                self.start_marker_line = Some(start);
                self.end_marker_line = Some(end);
            }
        }
    }

    /// Marker token name used by this chunk, if it has markers.
    pub fn marker_name(&self) -> Option<&'static str> {
        match self.kind {
            ChunkKind::Filler | ChunkKind::SyntheticClose => None,
            ChunkKind::PlaceholderMarker { .. } => Some(PLACEHOLDER_NAME),
            _ => Some(MARKER_NAME),
        }
    }

    /// Compute the template edit for the corrected Ruby of this chunk.
    /// Returns `None` when nothing changed or the correction cannot be mapped
    /// back safely.
    pub fn transfer(&self, corrected: &CorrectedChunk<'_>, template_lines: &[String]) -> Option<LineEdit> {
        if !matches!(self.kind, ChunkKind::PlaceholderMarker { .. })
            && corrected.lines == self.lines.as_slice()
            && self.marker_shift(corrected) == 0
        {
            return None;
        }

        let edit = match &self.kind {
            ChunkKind::PlaceholderMarker { indent, template_len } => {
                self.transfer_placeholder(*indent, *template_len, corrected, template_lines)
            }
            ChunkKind::Script(data) => self.transfer_script(data, corrected, template_lines),
            ChunkKind::TagAttributes { span } => self.transfer_tag_attributes(span, corrected, template_lines),
            ChunkKind::TagScript { span } => {
                self.transfer_single_line(span, corrected, template_lines, |code| Some(code.to_string()))
            }
            ChunkKind::InterpolatedText { span } => {
                self.transfer_single_line(span, corrected, template_lines, plain_text_from_literal)
            }
            ChunkKind::Comment { indent } => self.transfer_comment(*indent, corrected, template_lines),
            ChunkKind::LiteralFilter { indent, delimiter } => {
                self.transfer_literal_filter(*indent, delimiter, corrected, template_lines)
            }
            ChunkKind::CodeFilter { offset } => self.transfer_code_filter(*offset, corrected, template_lines),
            ChunkKind::Filler | ChunkKind::SyntheticClose => None,
        };

        if edit.is_none() {
            log::debug!(
                "{} chunk at line {}: corrections not transferred",
                self.kind.name(),
                self.node_line
            );
        }
        edit
    }

    /// How far the tool moved the start marker.
    fn marker_shift(&self, corrected: &CorrectedChunk<'_>) -> isize {
        leading_spaces(corrected.marker_line) as isize - self.start_marker_indent as isize
    }

    /// The template lines this chunk covers, clamped to `template_lines`.
    fn covered<'t>(&self, template_lines: &'t [String]) -> Option<&'t [String]> {
        let start = self.template_line_index;
        let end = self.template_end().min(template_lines.len());
        template_lines.get(start..end)
    }

    fn transfer_placeholder(
        &self,
        indent: usize,
        template_len: usize,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        let delta = leading_spaces(corrected.marker_line) as isize - indent as isize;
        if delta == 0 || template_len == 0 {
            return None;
        }
        let original = self.covered(template_lines)?;
        let reindented = original.iter().map(|line| indent_line(line, delta)).collect();
        LineEdit::between(self.template_line_index, original, reindented)
    }

    fn transfer_script(
        &self,
        data: &ScriptData,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        // Ruby line ranges of the pieces that are not blank lines.
        let mut units = Vec::new();
        let mut ruby_start = 0;
        for piece in &data.pieces {
            if !matches!(piece, ScriptPiece::Blank { .. }) {
                units.push((piece, ruby_start));
            }
            ruby_start += piece.ruby_len();
        }

        let Some(groups) = align_groups(corrected.lines, &units) else {
            return self.transfer_folded_block(data, corrected, template_lines);
        };

        let mut rendered = Vec::new();
        let mut groups_iter = groups.iter().zip(&units);
        let mut idx = 0;
        while idx < corrected.lines.len() {
            if corrected.lines[idx].trim().is_empty() {
                rendered.push(String::new());
                idx += 1;
                continue;
            }

            let ((group_start, group_len), (piece, ruby_start)) = groups_iter.next()?;
            if *group_start != idx {
                return None;
            }
            let group = &corrected.lines[*group_start..group_start + group_len];
            match piece {
                ScriptPiece::Close => {
                    if group.len() != 1 || group[0].trim() != self.lines[*ruby_start].trim() {
                        return None;
                    }
                }
                ScriptPiece::Statement {
                    token,
                    ruby_len,
                    template_start,
                    template_len,
                } => {
                    if group == &self.lines[*ruby_start..ruby_start + ruby_len] {
                        rendered.extend_from_slice(template_lines.get(*template_start..template_start + template_len)?);
                    } else {
                        rendered.extend(render_statement(group, *token, corrected.output_prefix)?);
                    }
                }
                ScriptPiece::Blank { .. } => return None,
            }
            idx += group_len;
        }

        if groups_iter.next().is_some() {
            return None;
        }

        LineEdit::between(self.template_line_index, self.covered(template_lines)?, rendered)
    }

    /// The tool folded the block this chunk opens into fewer statements
    /// (`b = 1 if a`, a one-line `{ }` block) and dropped the closing `end`.
    /// Only a chunk holding both its opener and its single close qualifies.
    fn transfer_folded_block(
        &self,
        data: &ScriptData,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        let closes = data
            .pieces
            .iter()
            .filter(|piece| matches!(piece, ScriptPiece::Close))
            .count();
        let last_piece = data
            .pieces
            .iter()
            .rev()
            .find(|piece| !matches!(piece, ScriptPiece::Blank { .. }));
        if !data.must_start_chunk
            || closes != 1
            || !matches!(last_piece, Some(ScriptPiece::Close))
            || is_mid_block_keyword(self.lines.first()?)
        {
            return None;
        }

        let close_at: usize = data
            .pieces
            .iter()
            .take_while(|piece| !matches!(piece, ScriptPiece::Close))
            .map(ScriptPiece::ruby_len)
            .sum();
        let close = self.lines.get(close_at)?.trim();
        let last_line = corrected.lines.iter().rev().find(|line| !line.trim().is_empty())?;
        if last_line.trim() == close {
            return None;
        }

        let output_token = data
            .pieces
            .iter()
            .find_map(|piece| match piece {
                ScriptPiece::Statement { token: Some(token), .. } => Some(*token),
                _ => None,
            })
            .unwrap_or(ScriptToken::Output);

        let mut rendered = Vec::new();
        for (start, len) in group_statements(corrected.lines) {
            let group = &corrected.lines[start..start + len];
            let first = group[0].trim_start();
            if first.is_empty() {
                rendered.push(String::new());
                continue;
            }
            if is_explicit_close(first)
                || is_mid_block_keyword(first)
                || group.iter().any(|line| block_opening(line).is_some())
            {
                return None;
            }
            let token = strip_output_token(first, corrected.output_prefix).map(|_| output_token);
            rendered.extend(render_statement(group, token, corrected.output_prefix)?);
        }

        log::debug!("script chunk at line {}: block folded by the tool", self.node_line);
        LineEdit::between(self.template_line_index, self.covered(template_lines)?, rendered)
    }

    fn transfer_tag_attributes(
        &self,
        span: &RawSpan,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        let first = corrected.lines.first()?;
        let mut new_lines: Vec<String> = corrected.lines.to_vec();
        new_lines[0] = first.trim_start().strip_prefix("W(")?.to_string();
        let last = new_lines.last_mut()?;
        *last = last.trim_end().strip_suffix(')')?.to_string();

        let new_text = new_lines.join("\n");
        let delta = self.marker_shift(corrected);
        if new_text == span.text && delta == 0 {
            return None;
        }

        // Continuation lines follow the opening brace when it moves, and the
        // tag when it is reindented.
        let original_brace = self.lines.first().map_or(0, |line| leading_spaces(line)) + 2;
        let brace_shift = (leading_spaces(first) + 2) as isize - original_brace as isize;
        for line in new_lines.iter_mut().skip(1) {
            *line = indent_line(line, delta - brace_shift);
        }

        let current = if span.matches(template_lines) {
            span.clone()
        } else {
            let end = span.end_line.min(template_lines.len().checked_sub(1)?);
            locate(template_lines, span.start_line, end, 0, &span.text)?
        };

        // The inline script of the same tag may already have moved the line.
        let head = template_lines.get(current.start_line)?.get(..current.start_col)?;
        let tail = template_lines.get(current.end_line)?.get(current.end_col..)?;
        let target = (self.start_marker_indent as isize + delta).max(0) as usize;
        new_lines[0].insert_str(0, &reindent_to(head, target));
        new_lines.last_mut()?.push_str(tail);

        LineEdit::between(
            current.start_line,
            template_lines.get(current.start_line..=current.end_line)?,
            new_lines,
        )
    }

    fn transfer_comment(
        &self,
        indent: usize,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        let original = self.covered(template_lines)?;
        if corrected.lines.iter().all(|line| line.trim().is_empty()) {
            return Some(LineEdit::delete(
                self.template_line_index,
                self.template_line_index + original.len(),
            ));
        }

        let first = corrected.lines.iter().find(|line| !line.trim().is_empty())?;
        let delta = leading_spaces(first) as isize - indent as isize;
        if delta == 0 {
            return None;
        }
        let reindented = original.iter().map(|line| indent_line(line, delta)).collect();
        LineEdit::between(self.template_line_index, original, reindented)
    }

    fn transfer_literal_filter(
        &self,
        indent: usize,
        delimiter: &str,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        let lines = corrected.lines;
        if lines.len() < 2
            || !lines[0].trim_end().ends_with(&format!("<<~{delimiter}"))
            || lines[lines.len() - 1].trim() != delimiter
        {
            return None;
        }

        let header_indent = leading_spaces(&lines[0]);
        let body = &lines[1..lines.len() - 1];
        if body
            .iter()
            .any(|line| !line.trim().is_empty() && leading_spaces(line) <= header_indent)
        {
            return None;
        }

        let new_body = body
            .iter()
            .map(|line| if line.trim().is_empty() { String::new() } else { line.clone() })
            .collect();
        self.filter_edit(header_indent as isize - indent as isize, new_body, template_lines)
    }

    fn transfer_code_filter(
        &self,
        offset: usize,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
    ) -> Option<LineEdit> {
        let delta = self.marker_shift(corrected);
        let header_indent = template_lines
            .get(self.template_line_index.checked_sub(1)?)
            .map(|header| leading_spaces(header) as isize + delta)?;

        let mut new_body = Vec::with_capacity(corrected.lines.len());
        for line in corrected.lines {
            if line.trim().is_empty() {
                new_body.push(String::new());
                continue;
            }
            let moved = indent_line(line, offset as isize);
            if leading_spaces(&moved) as isize <= header_indent {
                return None;
            }
            new_body.push(moved);
        }
        self.filter_edit(delta, new_body, template_lines)
    }

    /// Edit over a filter's header line and its body. The header, which has
    /// no Ruby counterpart, moves by `delta`.
    fn filter_edit(&self, delta: isize, body: Vec<String>, template_lines: &[String]) -> Option<LineEdit> {
        let header_index = self.template_line_index.checked_sub(1)?;
        let header = template_lines.get(header_index)?;
        let end = self.template_end().min(template_lines.len());
        let original = template_lines.get(header_index..end)?;

        let mut new_lines = Vec::with_capacity(body.len() + 1);
        new_lines.push(indent_line(header, delta));
        new_lines.extend(body);
        LineEdit::between(header_index, original, new_lines)
    }

    /// Single-line rewrite of the code at `span`. The line is reindented by
    /// the distance the Ruby line moved, unless the code sits on a
    /// continuation line of a multi-line attribute hash.
    fn transfer_single_line(
        &self,
        span: &RawSpan,
        corrected: &CorrectedChunk<'_>,
        template_lines: &[String],
        to_template: impl Fn(&str) -> Option<String>,
    ) -> Option<LineEdit> {
        let mut code_lines = corrected.lines.iter().filter(|line| !line.trim().is_empty());
        let line = code_lines.next()?;
        if code_lines.next().is_some() {
            return None;
        }

        let code = to_template(strip_output_token(line.trim_start(), corrected.output_prefix)?)?;
        let delta = if span.start_line + 1 == self.node_line {
            leading_spaces(line) as isize - leading_spaces(self.lines.first()?) as isize
        } else {
            0
        };
        if code == span.text && delta == 0 {
            return None;
        }

        let template_line = template_lines.get(span.start_line)?;
        if template_line.get(span.start_col..span.end_col)? != span.text {
            return None;
        }
        let replaced = format!(
            "{}{}{}",
            &template_line[..span.start_col],
            code,
            &template_line[span.end_col..]
        );
        LineEdit::between(
            span.start_line,
            std::slice::from_ref(template_line),
            vec![indent_line(&replaced, delta)],
        )
    }
}

/// Split the corrected lines of a script chunk into one `(start, len)` group
/// per non-blank piece. Line-for-line alignment is used when the line count
/// is unchanged; otherwise statements are regrouped syntactically.
fn align_groups(corrected: &[String], units: &[(&ScriptPiece, usize)]) -> Option<Vec<(usize, usize)>> {
    let non_blank: Vec<usize> = (0..corrected.len())
        .filter(|&idx| !corrected[idx].trim().is_empty())
        .collect();
    let expected: usize = units.iter().map(|(piece, _)| piece.ruby_len()).sum();

    if non_blank.len() == expected {
        let mut groups = Vec::with_capacity(units.len());
        let mut consumed = 0;
        for (piece, _) in units {
            let indexes = &non_blank[consumed..consumed + piece.ruby_len()];
            let start = *indexes.first()?;
            if indexes.last()? - start + 1 != indexes.len() {
                return None;
            }
            groups.push((start, indexes.len()));
            consumed += piece.ruby_len();
        }
        return Some(groups);
    }

    let groups: Vec<(usize, usize)> = group_statements(corrected)
        .into_iter()
        .filter(|(start, _)| !corrected[*start].trim().is_empty())
        .collect();
    (groups.len() == units.len()).then_some(groups)
}

/// Template lines for a corrected statement: the HAML operator in front of
/// the first line, continuation lines kept as comma-continued when possible
/// and pipe-continued otherwise.
fn render_statement(group: &[String], token: Option<ScriptToken>, output_prefix: &str) -> Option<Vec<String>> {
    let first = group.first()?;
    let indent = " ".repeat(leading_spaces(first));
    let code = first.trim_start();

    let (operator, code) = match token {
        Some(token) => (token.as_str(), strip_output_token(code, output_prefix)?),
        None if strip_output_token(code, output_prefix).is_some() => return None,
        None => ("-", code),
    };

    let mut lines = vec![format!("{indent}{operator} {}", code.trim_end())];
    lines.extend(group[1..].iter().map(|line| line.trim_end().to_string()));

    let comma_continued = lines[..lines.len() - 1].iter().all(|line| line.ends_with(','));
    if lines.len() > 1 && !comma_continued {
        for line in &mut lines {
            line.push_str(" |");
        }
    }
    Some(lines)
}

/// Text of a double-quoted Ruby literal built from interpolated plain text.
/// `None` when the literal uses escapes plain text cannot express or is no
/// longer a single literal.
fn plain_text_from_literal(literal: &str) -> Option<String> {
    let inner = literal.trim_end().strip_prefix('"')?.strip_suffix('"')?;
    let mut text = String::with_capacity(inner.len());
    let mut depth = 0usize;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        if depth > 0 {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            text.push(c);
            continue;
        }
        match c {
            '#' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push_str("#{");
                depth = 1;
            }
            '\\' => match chars.next()? {
                escaped @ ('"' | '\\') => text.push(escaped),
                _ => return None,
            },
            '"' => return None,
            _ => text.push(c),
        }
    }

    (depth == 0).then_some(text)
}

/// Strip the synthetic output assignment (`HL.out = `) from a line, however
/// the tool re-spaced it.
fn strip_output_token<'a>(code: &'a str, output_prefix: &str) -> Option<&'a str> {
    let token = output_prefix.trim_end().trim_end_matches('=').trim_end();
    let rest = code.strip_prefix(token)?.trim_start().strip_prefix('=')?;
    if rest.starts_with(['=', '~']) {
        return None;
    }
    Some(rest.trim_start())
}
