//! Walks the node tree and emits the chunk sequence.

use super::ExtractionOptions;
use super::chunk::{Chunk, ChunkKind, ScriptData, ScriptPiece};
use super::error::{ExtractionError, ExtractionResult};
use super::locate::{RawSpan, continuation_end, locate};
use super::prefix::Prefixes;
use super::script_syntax::{block_opening, is_explicit_close, is_mid_block_keyword};
use crate::template::parser::{is_pipe_continued, strip_pipe};
use crate::template::{InlineScript, Node, NodeData, ParsedTemplate, ScriptToken};
use crate::utils::indentation::{indent_line, leading_spaces, nested_block_end};

pub struct ChunkExtractor<'a> {
    template: &'a ParsedTemplate,
    lines: &'a [String],
    options: &'a ExtractionOptions,
    prefixes: &'a Prefixes,
    chunks: Vec<Chunk>,
    /// Last template line covered by an emitted chunk.
    last_template_line: usize,
}

impl<'a> ChunkExtractor<'a> {
    pub fn new(
        template: &'a ParsedTemplate,
        lines: &'a [String],
        options: &'a ExtractionOptions,
        prefixes: &'a Prefixes,
    ) -> Self {
        Self {
            template,
            lines,
            options,
            prefixes,
            chunks: Vec::new(),
            last_template_line: 0,
        }
    }

    pub fn extract(mut self) -> ExtractionResult<Vec<Chunk>> {
        let template = self.template;
        self.visit_children(&template.root.children)?;
        Ok(self.chunks)
    }

    fn push(&mut self, chunk: Chunk) {
        if !matches!(chunk.kind, ChunkKind::Filler | ChunkKind::SyntheticClose) {
            let last = chunk.template_line_index + chunk.template_line_count() - 1;
            self.last_template_line = self.last_template_line.max(last);
        }
        self.chunks.push(chunk);
    }

    fn visit_children(&mut self, children: &'a [Node]) -> ExtractionResult<()> {
        for (idx, child) in children.iter().enumerate() {
            self.visit(child, children.get(idx + 1))?;
        }
        Ok(())
    }

    fn visit(&mut self, node: &'a Node, next: Option<&'a Node>) -> ExtractionResult<()> {
        match &node.data {
            NodeData::Root => self.visit_children(&node.children),
            NodeData::Plain { .. } => {
                self.placeholder(node, 1);
                Ok(())
            }
            NodeData::Comment { .. } => {
                self.placeholder(node, 1);
                self.wrap_children(node)
            }
            NodeData::HamlComment { .. } => {
                self.haml_comment(node);
                Ok(())
            }
            NodeData::Script { code, token } => {
                let template = self.template;
                match template.interpolation_originals.get(code) {
                    Some(original) => {
                        self.interpolated_text(node, code, original);
                        Ok(())
                    }
                    None => self.script(node, code, Some(*token), next),
                }
            }
            NodeData::SilentScript { code } => self.script(node, code, None, next),
            NodeData::Tag { attributes, script, .. } => self.tag(node, attributes.as_deref(), script.as_ref()),
            NodeData::Filter { name, text } => {
                self.filter(node, name, text);
                Ok(())
            }
        }
    }

    fn indent_of(&self, node: &Node) -> usize {
        self.lines
            .get(node.line_index())
            .map_or(0, |line| leading_spaces(line))
    }

    fn placeholder(&mut self, node: &Node, template_len: usize) {
        let indent = self.indent_of(node);
        self.push(Chunk::placeholder(node.line, node.line_index(), indent, template_len));
    }

    fn script(
        &mut self,
        node: &'a Node,
        code: &str,
        token: Option<ScriptToken>,
        next: Option<&'a Node>,
    ) -> ExtractionResult<()> {
        let idx = node.line_index();
        let indent = self.indent_of(node);
        let opening = block_opening(code);
        let mid_block = is_mid_block_keyword(code);
        let next_is_mid_block = next.and_then(Node::script_code).is_some_and(is_mid_block_keyword);
        let opens = opening.is_some() || mid_block;

        if opening.is_some() && node.children.is_empty() && !next_is_mid_block {
            return Err(ExtractionError::UnsupportedConstruct {
                line: node.line,
                code: code.to_string(),
            });
        }

        let operator_len = token.map_or(1, |token| token.as_str().len());
        let end = continuation_end(self.lines, idx);
        let Some(span) = locate(self.lines, idx, end, indent + operator_len, code) else {
            log::debug!("line {}: raw source of `{code}` not found, span left out", node.line);
            return self.wrap_children(node);
        };

        let output = if token.is_some() { self.prefixes.output.as_str() } else { "" };
        let mut ruby = Vec::with_capacity(span.end_line - span.start_line + 1);
        for line_idx in span.start_line..=span.end_line {
            let raw = &self.lines[line_idx];
            if line_idx == span.start_line {
                let text = without_pipe(&raw[span.start_col..]);
                ruby.push(format!("{}{output}{}", " ".repeat(indent), text.trim_start()));
            } else {
                ruby.push(without_pipe(raw).to_string());
            }
        }

        let data = ScriptData {
            pieces: vec![ScriptPiece::Statement {
                token,
                ruby_len: ruby.len(),
                template_start: span.start_line,
                template_len: ruby.len(),
            }],
            must_start_chunk: opens,
            awaits_branch: opens && node.children.is_empty() && next_is_mid_block,
        };
        let start_marker = if mid_block { indent + 2 } else { indent };
        let end_marker = if opens { indent + 2 } else { indent };
        self.push(
            Chunk::new(ChunkKind::Script(data), node.line, span.start_line, ruby)
                .with_sequential_lines()
                .with_markers(start_marker, end_marker),
        );

        if !opens {
            return self.wrap_children(node);
        }

        self.visit_children(&node.children)?;
        let explicitly_closed = node
            .children
            .last()
            .and_then(Node::script_code)
            .is_some_and(is_explicit_close);
        if !next_is_mid_block && !explicitly_closed {
            let closing = opening.map_or("end", |opening| opening.closing());
            self.synthetic_close(node, indent, closing);
        }
        Ok(())
    }

    /// Plain text with interpolation is linted as the string literal the
    /// parser built from it; the original text locates it on the line.
    fn interpolated_text(&mut self, node: &Node, literal: &str, original: &str) {
        let idx = node.line_index();
        let indent = self.indent_of(node);
        let Some(start_col) = self
            .lines
            .get(idx)
            .and_then(|line| line.get(indent..))
            .and_then(|content| content.find(original))
            .map(|found| indent + found)
        else {
            log::debug!("line {}: interpolated text not found, span left out", node.line);
            self.placeholder(node, 1);
            return;
        };

        let span = RawSpan {
            start_line: idx,
            start_col,
            end_line: idx,
            end_col: start_col + original.len(),
            text: original.to_string(),
        };
        let ruby = vec![format!("{}{}{literal}", " ".repeat(indent), self.prefixes.output)];
        self.push(Chunk::new(ChunkKind::InterpolatedText { span }, node.line, idx, ruby).with_markers(indent, indent));
    }

    fn synthetic_close(&mut self, node: &Node, indent: usize, closing: &str) {
        let line = format!("{}{closing}", " ".repeat(indent));
        self.push(Chunk::new(
            ChunkKind::SyntheticClose,
            node.line,
            self.last_template_line,
            vec![line],
        ));
    }

    /// Nest children under `if <prefix>_tag` ... `end` so their indentation
    /// stays valid without opening a new scope.
    fn wrap_children(&mut self, node: &'a Node) -> ExtractionResult<()> {
        if node.children.is_empty() {
            return Ok(());
        }

        let pad = " ".repeat(self.indent_of(node));
        let open = format!("{pad}if {}_tag", self.prefixes.marker);
        self.push(Chunk::new(ChunkKind::Filler, node.line, node.line_index(), vec![open]));
        self.visit_children(&node.children)?;
        self.push(Chunk::new(
            ChunkKind::Filler,
            node.line,
            self.last_template_line,
            vec![format!("{pad}end")],
        ));
        Ok(())
    }

    fn tag(&mut self, node: &'a Node, attributes: Option<&str>, script: Option<&'a InlineScript>) -> ExtractionResult<()> {
        let idx = node.line_index();
        let indent = self.indent_of(node);
        let opening = script.and_then(|script| block_opening(&script.code));

        if opening.is_some() && node.children.is_empty() {
            return Err(ExtractionError::UnsupportedConstruct {
                line: node.line,
                code: script.map(|script| script.code.clone()).unwrap_or_default(),
            });
        }

        let mut emitted = false;
        let mut script_line = idx;

        if let Some(hash) = attributes {
            let last = (idx + hash.lines().count().saturating_sub(1)).min(self.lines.len().saturating_sub(1));
            match locate(self.lines, idx, last, indent, hash) {
                Some(span) => {
                    script_line = span.end_line;
                    let mut ruby: Vec<String> = span.text.lines().map(str::to_string).collect();
                    ruby[0] = format!("{}W({}", " ".repeat(span.start_col.saturating_sub(2)), ruby[0]);
                    if let Some(last) = ruby.last_mut() {
                        last.push(')');
                    }
                    let start_line = span.start_line;
                    self.push(
                        Chunk::new(ChunkKind::TagAttributes { span }, node.line, start_line, ruby)
                            .with_sequential_lines()
                            .with_markers(indent, indent),
                    );
                    emitted = true;
                }
                None => log::debug!("line {}: attribute hash not found, span left out", node.line),
            }
        }

        let mut script_emitted = false;
        if let Some(script) = script {
            match self.inline_script_span(script_line, &script.code) {
                Some(span) => {
                    let ruby = vec![format!("{}{}{}", " ".repeat(indent), self.prefixes.output, script.code)];
                    let end_marker = if opening.is_some() { indent + 2 } else { indent };
                    let line = span.start_line;
                    self.push(
                        Chunk::new(ChunkKind::TagScript { span }, node.line, line, ruby).with_markers(indent, end_marker),
                    );
                    emitted = true;
                    script_emitted = true;
                }
                None => log::debug!("line {}: inline script not found, span left out", node.line),
            }
        }

        if !emitted {
            self.placeholder(node, 1);
        }

        match opening {
            Some(opening) if script_emitted => {
                self.visit_children(&node.children)?;
                let explicitly_closed = node
                    .children
                    .last()
                    .and_then(Node::script_code)
                    .is_some_and(is_explicit_close);
                if !explicitly_closed {
                    self.synthetic_close(node, indent, opening.closing());
                }
                Ok(())
            }
            _ => self.wrap_children(node),
        }
    }

    /// An inline script always runs to the end of its line.
    fn inline_script_span(&self, line_idx: usize, code: &str) -> Option<RawSpan> {
        let trimmed = self.lines.get(line_idx)?.trim_end();
        if code.is_empty() || !trimmed.ends_with(code) {
            return None;
        }
        Some(RawSpan {
            start_line: line_idx,
            start_col: trimmed.len() - code.len(),
            end_line: line_idx,
            end_col: trimmed.len(),
            text: code.to_string(),
        })
    }

    fn haml_comment(&mut self, node: &Node) {
        let idx = node.line_index();
        let indent = self.indent_of(node);
        let end = nested_block_end(self.lines, idx, indent);
        let pad = " ".repeat(indent);

        let ruby = (idx..=end)
            .map(|line_idx| {
                let raw = &self.lines[line_idx];
                if line_idx == idx {
                    format!("{pad}#{}", raw.get(indent + 2..).unwrap_or(""))
                } else if raw.trim().is_empty() {
                    format!("{pad}#")
                } else {
                    format!("{pad}#{}", raw.get(indent..).unwrap_or(raw.trim_start()))
                }
            })
            .collect();

        self.push(
            Chunk::new(ChunkKind::Comment { indent }, node.line, idx, ruby)
                .with_sequential_lines()
                .with_markers(indent, indent),
        );
    }

    fn filter(&mut self, node: &Node, name: &str, text: &str) {
        let idx = node.line_index();
        let indent = self.indent_of(node);
        let end = nested_block_end(self.lines, idx, indent);
        let body = &self.lines[idx + 1..=end];

        if self.options.code_filters.iter().any(|filter| filter == name) {
            if body.is_empty() {
                return;
            }
            let base = body
                .iter()
                .filter(|line| !line.trim().is_empty())
                .map(|line| leading_spaces(line))
                .min()
                .unwrap_or(indent);
            let offset = base.saturating_sub(indent);
            let ruby = body
                .iter()
                .map(|line| {
                    if line.trim().is_empty() {
                        String::new()
                    } else {
                        indent_line(line, -(offset as isize))
                    }
                })
                .collect();
            self.push(
                Chunk::new(ChunkKind::CodeFilter { offset }, idx + 2, idx + 1, ruby)
                    .with_sequential_lines()
                    .with_markers(indent, indent),
            );
        } else if text.contains("#{") && !body.is_empty() {
            let mut delimiter = format!("{}_FILTER", self.prefixes.marker.to_uppercase());
            while body.iter().any(|line| line.contains(&delimiter)) {
                delimiter.push('_');
            }

            let pad = " ".repeat(indent);
            let mut ruby = Vec::with_capacity(body.len() + 2);
            ruby.push(format!("{pad}{}<<~{delimiter}", self.prefixes.output));
            ruby.extend(
                body.iter()
                    .map(|line| if line.trim().is_empty() { String::new() } else { line.clone() }),
            );
            ruby.push(format!("{pad}{delimiter}"));

            let mut chunk = Chunk::new(ChunkKind::LiteralFilter { indent, delimiter }, idx + 2, idx + 1, ruby)
                .with_markers(indent, indent);
            chunk.line_map = std::iter::once(idx)
                .chain(idx + 1..=end)
                .chain(std::iter::once(end))
                .collect();
            self.push(chunk);
        } else {
            self.placeholder(node, end - idx + 1);
        }
    }
}

fn without_pipe(text: &str) -> &str {
    let trimmed = text.trim_end();
    if is_pipe_continued(trimmed.trim_start()) {
        strip_pipe(trimmed)
    } else {
        trimmed
    }
}
