//! Indentation helpers shared by the parser and the Ruby extraction.

/// Number of leading ASCII spaces.
pub fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Shift a line by `delta` columns. Blank lines are returned untouched and a
/// negative delta never removes non-space characters.
pub fn indent_line(line: &str, delta: isize) -> String {
    if delta == 0 || line.trim().is_empty() {
        return line.to_string();
    }
    if delta > 0 {
        format!("{}{}", " ".repeat(delta as usize), line)
    } else {
        let remove = delta.unsigned_abs().min(leading_spaces(line));
        line[remove..].to_string()
    }
}

/// Give a line exactly `target` leading spaces.
pub fn reindent_to(line: &str, target: usize) -> String {
    indent_line(line, target as isize - leading_spaces(line) as isize)
}

/// Index of the last line nested under the line at `start` (more indented than
/// `indent`). Blank lines in between are included, trailing ones are not.
pub fn nested_block_end<S: AsRef<str>>(lines: &[S], start: usize, indent: usize) -> usize {
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        if leading_spaces(line) > indent {
            end = i;
        } else {
            break;
        }
    }
    end
}
