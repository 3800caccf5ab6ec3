//! A compact parser for the HAML subset the linter understands.
//!
//! The parser mirrors what the reference HAML parser hands to its consumers:
//! multi-line scripts are normalized to a single line of code, filter bodies
//! are dedented, and interpolated plain text is turned into a string-literal
//! script. It keeps no knowledge of where those normalized strings came from;
//! recovering the raw text is the job of the Ruby extraction.

use super::node::{InlineScript, InterpolationOriginals, Node, NodeData, ParsedTemplate, ScriptToken};
use crate::utils::indentation::{leading_spaces, nested_block_end};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: indentation must use spaces")]
    TabIndentation { line: usize },
    #[error("line {line}: inconsistent indentation")]
    InconsistentIndentation { line: usize },
    #[error("line {line}: illegal nesting: {reason}")]
    IllegalNesting { line: usize, reason: &'static str },
    #[error("line {line}: unbalanced {what}")]
    Unbalanced { line: usize, what: &'static str },
}

/// Parse template source into a node tree.
pub fn parse(source: &str) -> Result<ParsedTemplate, ParseError> {
    let lines: Vec<&str> = source.lines().collect();
    let mut parser = Parser {
        lines: &lines,
        pos: 0,
        originals: InterpolationOriginals::new(),
    };
    let children = parser.parse_block(None)?;
    let root = Node::new(1, NodeData::Root).with_children(children);
    Ok(ParsedTemplate::new(source, root, parser.originals))
}

struct Parser<'a> {
    lines: &'a [&'a str],
    pos: usize,
    originals: InterpolationOriginals,
}

impl<'a> Parser<'a> {
    /// Parse sibling nodes until a line at or above `parent_indent` is reached.
    fn parse_block(&mut self, parent_indent: Option<usize>) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        let mut level: Option<usize> = None;

        loop {
            while self.pos < self.lines.len() && self.lines[self.pos].trim().is_empty() {
                self.pos += 1;
            }
            let Some(line) = self.lines.get(self.pos) else {
                break;
            };

            let indent = indentation(line, self.pos + 1)?;
            if parent_indent.is_some_and(|parent| indent <= parent) {
                break;
            }
            match level {
                None => level = Some(indent),
                Some(level) if level != indent => {
                    return Err(ParseError::InconsistentIndentation { line: self.pos + 1 });
                }
                Some(_) => {}
            }

            nodes.push(self.parse_node(indent)?);
        }

        Ok(nodes)
    }

    fn parse_node(&mut self, indent: usize) -> Result<Node, ParseError> {
        let line_no = self.pos + 1;
        let line = self.lines[self.pos];
        let content = &line[indent..];

        if let Some(text) = content.strip_prefix("-#") {
            return Ok(self.parse_haml_comment(indent, text));
        }

        if content.starts_with("!!!") {
            self.pos += 1;
            self.reject_children(indent, line_no, "nesting within a doctype is illegal")?;
            return Ok(Node::new(line_no, NodeData::Plain { text: content.to_string() }));
        }

        if let Some(token) = ScriptToken::from_prefix(content) {
            let code = self.read_script_code(&content[token.as_str().len()..]);
            self.pos += 1;
            let children = self.parse_block(Some(indent))?;
            return Ok(Node::new(line_no, NodeData::Script { code, token }).with_children(children));
        }

        if let Some(rest) = content.strip_prefix('-') {
            let code = self.read_script_code(rest);
            self.pos += 1;
            let children = self.parse_block(Some(indent))?;
            return Ok(Node::new(line_no, NodeData::SilentScript { code }).with_children(children));
        }

        if content.starts_with('%') || starts_with_class_or_id(content) {
            return self.parse_tag(indent, line_no);
        }

        if let Some(rest) = content.strip_prefix('/') {
            self.pos += 1;
            let children = self.parse_block(Some(indent))?;
            let text = rest.trim().to_string();
            return Ok(Node::new(line_no, NodeData::Comment { text }).with_children(children));
        }

        if let Some(rest) = content.strip_prefix(':')
            && rest.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            return Ok(self.parse_filter(indent, rest));
        }

        let text = content.strip_prefix('\\').unwrap_or(content);
        self.pos += 1;
        self.reject_children(indent, line_no, "nesting within plain text is illegal")?;
        Ok(self.plain_node(line_no, text))
    }

    fn reject_children(&mut self, indent: usize, line: usize, reason: &'static str) -> Result<(), ParseError> {
        if self.parse_block(Some(indent))?.is_empty() {
            Ok(())
        } else {
            Err(ParseError::IllegalNesting { line, reason })
        }
    }

    /// Plain text; interpolated text becomes a string-literal script.
    fn plain_node(&mut self, line_no: usize, text: &str) -> Node {
        if !text.contains("#{") {
            return Node::new(line_no, NodeData::Plain { text: text.to_string() });
        }
        let code = ruby_string_literal(text);
        self.originals.insert(code.clone(), text.to_string());
        Node::new(
            line_no,
            NodeData::Script {
                code,
                token: ScriptToken::Output,
            },
        )
    }

    /// Read the code of a script starting on the current line, consuming
    /// comma and pipe continuation lines. Leaves `pos` on the last line read.
    fn read_script_code(&mut self, first: &str) -> String {
        let first = first.trim();
        let mut parts = Vec::new();

        if is_pipe_continued(first) {
            parts.push(strip_pipe(first).to_string());
            while let Some(next) = self.lines.get(self.pos + 1) {
                if !is_pipe_continued(next.trim()) {
                    break;
                }
                self.pos += 1;
                parts.push(strip_pipe(next.trim()).to_string());
            }
        } else {
            parts.push(first.to_string());
            let mut current = first;
            while current.ends_with(',') {
                let Some(next) = self.lines.get(self.pos + 1) else {
                    break;
                };
                if next.trim().is_empty() {
                    break;
                }
                self.pos += 1;
                current = next.trim();
                parts.push(current.to_string());
            }
        }

        parts.retain(|part| !part.is_empty());
        parts.join(" ")
    }

    fn parse_haml_comment(&mut self, indent: usize, first: &str) -> Node {
        let line_no = self.pos + 1;
        let end = nested_block_end(self.lines, self.pos, indent);
        let mut text = first.trim().to_string();
        for line in &self.lines[self.pos + 1..=end] {
            text.push('\n');
            text.push_str(line.trim());
        }
        self.pos = end + 1;
        Node::new(line_no, NodeData::HamlComment { text })
    }

    fn parse_filter(&mut self, indent: usize, rest: &str) -> Node {
        let line_no = self.pos + 1;
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let end = nested_block_end(self.lines, self.pos, indent);
        let body = &self.lines[self.pos + 1..=end];
        let base = body
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| leading_spaces(line))
            .min()
            .unwrap_or(0);
        let text = body
            .iter()
            .map(|line| if line.trim().is_empty() { "" } else { &line[base..] })
            .collect::<Vec<_>>()
            .join("\n");
        self.pos = end + 1;
        Node::new(line_no, NodeData::Filter { name, text })
    }

    fn parse_tag(&mut self, indent: usize, line_no: usize) -> Result<Node, ParseError> {
        let mut line = self.lines[self.pos];
        let mut col = indent;

        let name = if line[col..].starts_with('%') {
            col += 1;
            let len = ident_len(&line[col..], true);
            let name = line[col..col + len].to_string();
            col += len;
            name
        } else {
            "div".to_string()
        };

        while starts_with_class_or_id(&line[col..]) {
            col += 1;
            col += ident_len(&line[col..], false);
        }

        let mut attributes = None;
        loop {
            let (open, close, what) = match line[col..].chars().next() {
                Some('{') => ('{', '}', "attribute hash"),
                Some('(') => ('(', ')', "attribute list"),
                Some('[') => ('[', ']', "object reference"),
                _ => break,
            };
            let (text, end_line, end_col) = self.read_balanced(open, close, col, what)?;
            if open == '{' && attributes.is_none() {
                attributes = Some(text);
            }
            self.pos = end_line;
            line = self.lines[self.pos];
            col = end_col;
        }

        col += line[col..]
            .chars()
            .take_while(|c| matches!(c, '<' | '>' | '/'))
            .count();

        let rest = &line[col..];
        let (script, text) = match ScriptToken::from_prefix(rest) {
            Some(token) => {
                let code = rest[token.as_str().len()..].trim().to_string();
                (Some(InlineScript { code, token }), None)
            }
            None => {
                let text = rest.trim();
                (None, (!text.is_empty()).then(|| text.to_string()))
            }
        };

        self.pos += 1;
        let children = self.parse_block(Some(indent))?;
        Ok(Node::new(
            line_no,
            NodeData::Tag {
                name,
                attributes,
                script,
                text,
            },
        )
        .with_children(children))
    }

    /// Read a bracketed region starting at `col` on the current line, possibly
    /// spanning lines. Returns the text (brackets included, lines joined with
    /// `\n`), the line index it ends on and the byte column just past it.
    fn read_balanced(
        &self,
        open: char,
        close: char,
        col: usize,
        what: &'static str,
    ) -> Result<(String, usize, usize), ParseError> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut idx = self.pos;
        let mut start = col;

        while let Some(line) = self.lines.get(idx) {
            for (offset, c) in line[start..].char_indices() {
                text.push(c);
                if let Some(q) = quote {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == q {
                        quote = None;
                    }
                    continue;
                }
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == open {
                    depth += 1;
                } else if c == close {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok((text, idx, start + offset + c.len_utf8()));
                    }
                }
            }
            text.push('\n');
            idx += 1;
            start = 0;
        }

        Err(ParseError::Unbalanced {
            line: self.pos + 1,
            what,
        })
    }
}

fn indentation(line: &str, line_no: usize) -> Result<usize, ParseError> {
    let whitespace = &line[..line.len() - line.trim_start().len()];
    if whitespace.contains('\t') {
        return Err(ParseError::TabIndentation { line: line_no });
    }
    Ok(whitespace.len())
}

fn starts_with_class_or_id(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some('.' | '#'))
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn ident_len(text: &str, allow_colon: bool) -> usize {
    text.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || (allow_colon && *c == ':'))
        .count()
}

pub(crate) fn is_pipe_continued(trimmed: &str) -> bool {
    trimmed.len() > 1 && trimmed.ends_with(" |")
}

pub(crate) fn strip_pipe(trimmed: &str) -> &str {
    trimmed.trim_end_matches('|').trim_end()
}

/// Double-quoted Ruby literal for interpolated text. Quotes and backslashes
/// outside `#{...}` are escaped.
fn ruby_string_literal(text: &str) -> String {
    let mut out = String::from("\"");
    let mut depth = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if depth == 0 {
            if c == '#' && chars.peek() == Some(&'{') {
                chars.next();
                out.push_str("#{");
                depth = 1;
            } else if c == '"' || c == '\\' {
                out.push('\\');
                out.push(c);
            } else {
                out.push(c);
            }
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        out.push(c);
    }

    out.push('"');
    out
}
