use serde::Serialize;

/// A finding of the external tool, located in the template.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct LintWarning {
    pub message: String,
    /// 1-based template line.
    pub line: usize,
    /// 1-based column as reported for the generated Ruby.
    pub column: usize,
    pub severity: Severity,
    /// The tool's rule identifier, e.g. `Layout/SpaceInsideHashLiteralBraces`.
    pub rule_name: Option<String>,
    /// Whether the tool can autocorrect this finding.
    pub correctable: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
