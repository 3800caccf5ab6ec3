//! Node tree produced by the template parser.
//!
//! The tree is immutable once built. Every node records the 1-based template
//! line it starts on; the raw text of the template is kept alongside the tree
//! in [`ParsedTemplate`] so later stages can locate the exact characters a
//! node was parsed from.

use std::collections::HashMap;

/// Node type, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Plain,
    Script,
    SilentScript,
    Tag,
    Filter,
    Comment,
    HamlComment,
}

/// The operator that introduced an outputting script (`= foo`, `!= foo`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptToken {
    /// `=`
    Output,
    /// `!=`
    Unescaped,
    /// `&=`
    Escaped,
    /// `~`
    Preserved,
}

impl ScriptToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptToken::Output => "=",
            ScriptToken::Unescaped => "!=",
            ScriptToken::Escaped => "&=",
            ScriptToken::Preserved => "~",
        }
    }

    /// Parse the script operator at the start of `text`, if any.
    pub fn from_prefix(text: &str) -> Option<Self> {
        if text.starts_with("!=") {
            Some(ScriptToken::Unescaped)
        } else if text.starts_with("&=") {
            Some(ScriptToken::Escaped)
        } else if text.starts_with('=') {
            Some(ScriptToken::Output)
        } else if text.starts_with('~') {
            Some(ScriptToken::Preserved)
        } else {
            None
        }
    }
}

/// Script attached to the end of a tag line (`%p= foo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScript {
    pub code: String,
    pub token: ScriptToken,
}

/// Type-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Plain {
        text: String,
    },
    /// `code` is the normalized code: continuation lines are joined with a
    /// single space and pipe markers are removed.
    Script {
        code: String,
        token: ScriptToken,
    },
    SilentScript {
        code: String,
    },
    Tag {
        name: String,
        /// Source of the `{...}` attribute hash, braces included.
        attributes: Option<String>,
        script: Option<InlineScript>,
        text: Option<String>,
    },
    Filter {
        name: String,
        /// Body with the common indentation removed.
        text: String,
    },
    /// Visible (HTML) comment.
    Comment {
        text: String,
    },
    /// `-#` comment, never rendered.
    HamlComment {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// 1-based template line.
    pub line: usize,
    pub data: NodeData,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(line: usize, data: NodeData) -> Self {
        Self {
            line,
            data,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Root => NodeKind::Root,
            NodeData::Plain { .. } => NodeKind::Plain,
            NodeData::Script { .. } => NodeKind::Script,
            NodeData::SilentScript { .. } => NodeKind::SilentScript,
            NodeData::Tag { .. } => NodeKind::Tag,
            NodeData::Filter { .. } => NodeKind::Filter,
            NodeData::Comment { .. } => NodeKind::Comment,
            NodeData::HamlComment { .. } => NodeKind::HamlComment,
        }
    }

    /// Code of a script or silent script node.
    pub fn script_code(&self) -> Option<&str> {
        match &self.data {
            NodeData::Script { code, .. } | NodeData::SilentScript { code } => Some(code),
            _ => None,
        }
    }

    /// 0-based template line index.
    pub fn line_index(&self) -> usize {
        self.line.saturating_sub(1)
    }
}

/// Normalized script code → the plain text it was generated from.
///
/// Interpolated plain text (`Hello #{name}`) is turned into a string-literal
/// script by the parser; this map lets consumers recognise such scripts and
/// recover what the author actually wrote.
pub type InterpolationOriginals = HashMap<String, String>;

/// A parsed template: the node tree plus everything needed to map back to the
/// raw text.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub source: String,
    pub lines: Vec<String>,
    pub root: Node,
    pub interpolation_originals: InterpolationOriginals,
}

impl ParsedTemplate {
    pub fn new(source: &str, root: Node, interpolation_originals: InterpolationOriginals) -> Self {
        Self {
            source: source.to_string(),
            lines: source.lines().map(str::to_string).collect(),
            root,
            interpolation_originals,
        }
    }

    /// Serialize template lines back to text, keeping the original line ending
    /// style and trailing newline.
    pub fn render_lines(&self, lines: &[String]) -> String {
        let line_ending = if self.source.contains("\r\n") { "\r\n" } else { "\n" };
        let mut out = lines.join(line_ending);
        if self.source.ends_with('\n') && !lines.is_empty() {
            out.push_str(line_ending);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_token_prefixes() {
        assert_eq!(ScriptToken::from_prefix("= foo"), Some(ScriptToken::Output));
        assert_eq!(ScriptToken::from_prefix("!= foo"), Some(ScriptToken::Unescaped));
        assert_eq!(ScriptToken::from_prefix("&= foo"), Some(ScriptToken::Escaped));
        assert_eq!(ScriptToken::from_prefix("~ foo"), Some(ScriptToken::Preserved));
        assert_eq!(ScriptToken::from_prefix("- foo"), None);
    }

    #[test]
    fn test_render_lines_keeps_line_endings() {
        let root = Node::new(0, NodeData::Root);
        let template = ParsedTemplate::new("a\r\nb\r\n", root.clone(), InterpolationOriginals::new());
        assert_eq!(template.lines, vec!["a", "b"]);
        assert_eq!(template.render_lines(&template.lines), "a\r\nb\r\n");

        let template = ParsedTemplate::new("a\nb", root, InterpolationOriginals::new());
        assert_eq!(template.render_lines(&template.lines), "a\nb");
    }
}
