//! Finding the raw template text a normalized code string was parsed from.

use crate::template::parser::is_pipe_continued;
use regex::Regex;

/// Location of raw code in the template. Columns are byte offsets; `end_col`
/// is exclusive and refers to `end_line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpan {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub text: String,
}

impl RawSpan {
    /// Whether `lines` still hold exactly this span's text.
    pub fn matches(&self, lines: &[String]) -> bool {
        extract(lines, self.start_line, self.start_col, self.end_line, self.end_col).as_deref()
            == Some(self.text.as_str())
    }
}

fn extract(lines: &[String], start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Option<String> {
    if start_line == end_line {
        return lines.get(start_line)?.get(start_col..end_col).map(str::to_string);
    }
    let mut text = lines.get(start_line)?.get(start_col..)?.to_string();
    for line in lines.get(start_line + 1..end_line)? {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    text.push_str(lines.get(end_line)?.get(..end_col)?);
    Some(text)
}

/// Last line of a script starting at `start`: follows trailing-comma and
/// trailing-pipe continuation the way the parser does.
pub fn continuation_end(lines: &[String], start: usize) -> usize {
    let Some(first) = lines.get(start) else {
        return start;
    };

    let mut end = start;
    if is_pipe_continued(first.trim()) {
        while lines.get(end + 1).is_some_and(|next| is_pipe_continued(next.trim())) {
            end += 1;
        }
    } else {
        while lines[end].trim_end().ends_with(',') && lines.get(end + 1).is_some_and(|next| !next.trim().is_empty()) {
            end += 1;
        }
    }
    end
}

/// Locate `code` in `lines[start..=end]`, searching the first line from
/// `from_col`. Exact text is tried first, then a pattern that tolerates
/// re-serialized whitespace around commas and pipe continuations. The first
/// match wins.
pub fn locate(lines: &[String], start: usize, end: usize, from_col: usize, code: &str) -> Option<RawSpan> {
    if code.trim().is_empty() || end < start || end >= lines.len() {
        return None;
    }

    // (offset in region, line index, column of the region start on that line)
    let mut offsets = Vec::with_capacity(end - start + 1);
    let mut region = String::new();
    for (idx, line) in lines.iter().enumerate().take(end + 1).skip(start) {
        let base = if idx == start { from_col } else { 0 };
        offsets.push((region.len(), idx, base));
        region.push_str(line.get(base..)?);
        if idx < end {
            region.push('\n');
        }
    }

    let (begin, finish) = match region.find(code) {
        Some(offset) => (offset, offset + code.len()),
        None => {
            let found = tolerant_pattern(code)?.find(&region)?;
            (found.start(), found.end())
        }
    };

    let position = |offset: usize| {
        offsets
            .iter()
            .rev()
            .find(|(region_offset, _, _)| *region_offset <= offset)
            .map(|(region_offset, idx, base)| (*idx, base + offset - region_offset))
    };
    let (start_line, start_col) = position(begin)?;
    let (end_line, end_col) = position(finish)?;

    Some(RawSpan {
        start_line,
        start_col,
        end_line,
        end_col,
        text: region[begin..finish].to_string(),
    })
}

/// Pattern matching `code` with any whitespace, newlines or continuation
/// pipes between comma-separated parts and between words.
pub fn tolerant_pattern(code: &str) -> Option<Regex> {
    let pattern = code
        .split(',')
        .map(|part| {
            part.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[\s|]+")
        })
        .collect::<Vec<_>>()
        .join(r"\s*,[\s|]*");
    if pattern.is_empty() {
        return None;
    }
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_exact_match_single_line() {
        let lines = lines("%p\n  = foo(bar)");
        let span = locate(&lines, 1, 1, 3, "foo(bar)").unwrap();
        assert_eq!((span.start_line, span.start_col, span.end_line, span.end_col), (1, 4, 1, 12));
        assert!(span.matches(&lines));
    }

    #[test]
    fn test_comma_continuation() {
        let lines = lines("= link_to 'x',\n    path,\n    class: 'y'\n%p");
        assert_eq!(continuation_end(&lines, 0), 2);
        let span = locate(&lines, 0, 2, 1, "link_to 'x', path, class: 'y'").unwrap();
        assert_eq!(span.start_line, 0);
        assert_eq!(span.start_col, 2);
        assert_eq!(span.end_line, 2);
        assert_eq!(span.text, "link_to 'x',\n    path,\n    class: 'y'");
        assert!(span.matches(&lines));
    }

    #[test]
    fn test_pipe_continuation() {
        let lines = lines("- foo = bar( |\n    baz) |\n%p");
        assert_eq!(continuation_end(&lines, 0), 1);
        let span = locate(&lines, 0, 1, 1, "foo = bar( baz)").unwrap();
        assert_eq!((span.start_line, span.end_line), (0, 1));
        assert_eq!(span.text, "foo = bar( |\n    baz)");
    }

    #[test]
    fn test_first_match_wins() {
        let lines = lines("= a, b, a,  b");
        let span = locate(&lines, 0, 0, 1, "a, b").unwrap();
        assert_eq!(span.start_col, 2);
    }

    #[test]
    fn test_not_found() {
        let lines = lines("= foo");
        assert!(locate(&lines, 0, 0, 1, "bar").is_none());
        assert!(locate(&lines, 0, 0, 1, "  ").is_none());
    }
}
