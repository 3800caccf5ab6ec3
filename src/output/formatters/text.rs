//! Default text output formatter with colors

use crate::output::OutputFormatter;
use crate::warning::{LintWarning, Severity};
use colored::*;

/// Human-readable formatter: `file:line:column: [rule] message [*]`
pub struct TextFormatter {
    use_colors: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_colors() -> Self {
        Self { use_colors: false }
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_warnings(&self, warnings: &[LintWarning], file_path: &str) -> String {
        let mut output = String::new();

        for warning in warnings {
            let rule_name = warning.rule_name.as_deref().unwrap_or("unknown");
            let rule = format!("[{rule_name}]");
            let fix_indicator = if warning.correctable { " [*]" } else { "" };

            let line = format!(
                "{}:{}:{}: {} {}{}",
                self.paint(file_path, |s| s.blue().underline()),
                self.paint(&warning.line.to_string(), |s| s.cyan()),
                self.paint(&warning.column.to_string(), |s| s.cyan()),
                match warning.severity {
                    Severity::Error => self.paint(&rule, |s| s.red()),
                    Severity::Warning | Severity::Info => self.paint(&rule, |s| s.yellow()),
                },
                warning.message,
                self.paint(fix_indicator, |s| s.green()),
            );

            output.push_str(&line);
            output.push('\n');
        }

        if output.ends_with('\n') {
            output.pop();
        }

        output
    }

    fn format_summary(&self, files_processed: usize, total_warnings: usize, duration_ms: u64) -> Option<String> {
        let files = if files_processed == 1 { "file" } else { "files" };
        let summary = if total_warnings == 0 {
            self.paint(&format!("No issues found in {files_processed} {files}"), |s| s.green())
        } else {
            let issues = if total_warnings == 1 { "issue" } else { "issues" };
            self.paint(
                &format!("Found {total_warnings} {issues} in {files_processed} {files}"),
                |s| s.yellow().bold(),
            )
        };
        Some(format!("{summary} ({duration_ms}ms)"))
    }

    fn use_colors(&self) -> bool {
        self.use_colors
    }
}
