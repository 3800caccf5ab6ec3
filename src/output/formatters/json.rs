//! JSON output formatter

use crate::output::OutputFormatter;
use crate::warning::LintWarning;
use serde_json::{Value, json};

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    collect_all: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter that leaves output to [`format_all_warnings_as_json`]
    pub fn new_collecting() -> Self {
        Self { collect_all: true }
    }
}

fn warning_to_json(file_path: &str, warning: &LintWarning) -> Value {
    json!({
        "file": file_path,
        "line": warning.line,
        "column": warning.column,
        "rule": warning.rule_name.as_deref().unwrap_or("unknown"),
        "message": warning.message,
        "severity": warning.severity.as_str(),
        "fixable": warning.correctable,
    })
}

impl OutputFormatter for JsonFormatter {
    fn format_warnings(&self, warnings: &[LintWarning], file_path: &str) -> String {
        if self.collect_all {
            return String::new();
        }

        let json_warnings: Vec<Value> = warnings.iter().map(|w| warning_to_json(file_path, w)).collect();
        serde_json::to_string_pretty(&json_warnings).unwrap_or_default()
    }
}

/// Format all warnings from multiple files as a single JSON document
pub fn format_all_warnings_as_json(all_warnings: &[(String, Vec<LintWarning>)]) -> String {
    let json_warnings: Vec<Value> = all_warnings
        .iter()
        .flat_map(|(file_path, warnings)| warnings.iter().map(move |w| warning_to_json(file_path, w)))
        .collect();

    serde_json::to_string_pretty(&json_warnings).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::Severity;

    fn warning() -> LintWarning {
        LintWarning {
            message: "Useless assignment to variable - `x`.".to_string(),
            line: 4,
            column: 1,
            severity: Severity::Warning,
            rule_name: Some("Lint/UselessAssignment".to_string()),
            correctable: false,
        }
    }

    #[test]
    fn test_format_warnings_empty() {
        assert_eq!(JsonFormatter::new().format_warnings(&[], "a.haml"), "[]");
    }

    #[test]
    fn test_collecting_mode_defers_output() {
        assert_eq!(JsonFormatter::new_collecting().format_warnings(&[warning()], "a.haml"), "");
    }

    #[test]
    fn test_format_warning_fields() {
        let output = JsonFormatter::new().format_warnings(&[warning()], "a.haml");
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["file"], "a.haml");
        assert_eq!(parsed[0]["line"], 4);
        assert_eq!(parsed[0]["rule"], "Lint/UselessAssignment");
        assert_eq!(parsed[0]["severity"], "warning");
        assert_eq!(parsed[0]["fixable"], false);
    }

    #[test]
    fn test_format_all_warnings() {
        let all = vec![
            ("a.haml".to_string(), vec![warning()]),
            ("b.haml".to_string(), vec![]),
            ("c.haml".to_string(), vec![warning(), warning()]),
        ];
        let parsed: Value = serde_json::from_str(&format_all_warnings_as_json(&all)).unwrap();
        let array = parsed.as_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[2]["file"], "c.haml");
    }
}
