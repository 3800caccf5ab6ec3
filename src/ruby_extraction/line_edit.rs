/// Replacement of the template lines `start..end` by `replacement`.
///
/// Edits are computed by one chunk against the current template lines and
/// applied immediately, so they never need to be rebased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: Vec<String>,
}

impl LineEdit {
    /// Edit turning `original` (the lines starting at `start`) into
    /// `replacement`, trimmed to the lines that actually differ. Returns
    /// `None` when nothing changes.
    pub fn between(start: usize, original: &[String], replacement: Vec<String>) -> Option<Self> {
        if original == replacement.as_slice() {
            return None;
        }

        let prefix = original
            .iter()
            .zip(&replacement)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = original[prefix..]
            .iter()
            .rev()
            .zip(replacement[prefix..].iter().rev())
            .take_while(|(a, b)| a == b)
            .count();

        let kept = replacement.len() - suffix;
        Some(Self {
            start: start + prefix,
            end: start + original.len() - suffix,
            replacement: replacement[prefix..kept].to_vec(),
        })
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            replacement: Vec::new(),
        }
    }

    pub fn apply(&self, lines: &mut Vec<String>) {
        let end = self.end.min(lines.len());
        let start = self.start.min(end);
        lines.splice(start..end, self.replacement.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_between_trims_common_lines() {
        let original = strings(&["a", "b", "c", "d"]);
        let edit = LineEdit::between(10, &original, strings(&["a", "x", "y", "d"])).unwrap();
        assert_eq!(edit.start, 11);
        assert_eq!(edit.end, 13);
        assert_eq!(edit.replacement, strings(&["x", "y"]));
    }

    #[test]
    fn test_between_identical() {
        let original = strings(&["a", "b"]);
        assert_eq!(LineEdit::between(0, &original, original.clone()), None);
    }

    #[test]
    fn test_between_with_repeated_lines() {
        let original = strings(&["a", "a"]);
        let edit = LineEdit::between(0, &original, strings(&["a"])).unwrap();
        let mut lines = original.clone();
        edit.apply(&mut lines);
        assert_eq!(lines, strings(&["a"]));
    }

    #[test]
    fn test_apply() {
        let mut lines = strings(&["1", "2", "3", "4"]);
        LineEdit::delete(1, 3).apply(&mut lines);
        assert_eq!(lines, strings(&["1", "4"]));
    }
}
