//! Just enough Ruby syntax awareness to keep the generated source valid.

use regex::Regex;
use std::sync::LazyLock;

static DO_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bdo\s*(\|[^|]*\|)?\s*$").unwrap());
static BRACE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*(\|[^|]*\|)?\s*$").unwrap());
static KEYWORD_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w@$.\[\]]+\s*(?:\|\||&&|[-+*/])?=\s*)?(?:if|unless|case|while|until|for|begin|def|class|module)\b")
        .unwrap()
});
static ENDS_WITH_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[;\s]end\s*$").unwrap());
static MID_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:else|elsif|when|in|rescue|ensure)\b").unwrap());
static EXPLICIT_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:end\b|\})").unwrap());

/// How a script line opens a block that needs a matching close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOpening {
    /// `if`, `case`, `begin`... closed by `end`.
    Keyword,
    /// `foo do |x|`, closed by `end`.
    DoBlock,
    /// `foo { |x|`, closed by `}`.
    BraceBlock,
}

impl BlockOpening {
    pub fn closing(&self) -> &'static str {
        match self {
            BlockOpening::Keyword | BlockOpening::DoBlock => "end",
            BlockOpening::BraceBlock => "}",
        }
    }
}

/// Detect whether normalized script code opens a block.
pub fn block_opening(code: &str) -> Option<BlockOpening> {
    let code = code.trim();
    if DO_BLOCK.is_match(code) {
        Some(BlockOpening::DoBlock)
    } else if BRACE_BLOCK.is_match(code) {
        Some(BlockOpening::BraceBlock)
    } else if KEYWORD_BLOCK.is_match(code) && !ENDS_WITH_END.is_match(code) {
        Some(BlockOpening::Keyword)
    } else {
        None
    }
}

/// `else`, `elsif`, `when`, `in`, `rescue` and `ensure` continue a block
/// opened by a preceding sibling.
pub fn is_mid_block_keyword(code: &str) -> bool {
    MID_BLOCK.is_match(code.trim_start())
}

pub fn is_explicit_close(code: &str) -> bool {
    EXPLICIT_CLOSE.is_match(code.trim_start())
}

/// Split Ruby lines into statements. Each group is a `(start, len)` pair;
/// blank lines form groups of their own.
pub fn group_statements<S: AsRef<str>>(lines: &[S]) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let start = i;
        if lines[i].as_ref().trim().is_empty() {
            groups.push((start, 1));
            i += 1;
            continue;
        }

        let mut depth = 0i32;
        loop {
            let line = lines[i].as_ref();
            depth = (depth + bracket_delta(line)).max(0);
            let next = lines.get(i + 1).map(AsRef::as_ref);
            let continues = depth > 0
                || continues_statement(line)
                || next.is_some_and(|next| next.trim_start().starts_with('.'));
            if !continues || next.is_none_or(|next| next.trim().is_empty()) {
                break;
            }
            i += 1;
        }
        groups.push((start, i - start + 1));
        i += 1;
    }

    groups
}

fn continues_statement(line: &str) -> bool {
    let code = strip_comment(line).trim_end();
    code.ends_with(',') || code.ends_with('\\') || code.ends_with("&&") || code.ends_with("||")
}

/// Net count of opened brackets on a line, ignoring strings, comments and a
/// trailing brace-block opener.
fn bracket_delta(line: &str) -> i32 {
    let code = strip_comment(line);
    let code = match BRACE_BLOCK.find(code) {
        Some(found) => &code[..found.start()],
        None => code,
    };

    let mut delta = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in code.chars() {
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
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => delta += 1,
            ')' | ']' | '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Code before a `#` comment that is not inside a string or interpolation.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';
    for (idx, c) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
        } else if c == '"' || c == '\'' {
            quote = Some(c);
        } else if c == '#' && (prev == '\0' || prev.is_whitespace()) {
            return &line[..idx];
        }
        prev = c;
    }
    line
}
