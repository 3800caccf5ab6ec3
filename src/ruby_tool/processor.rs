//! Lints and autocorrects the Ruby embedded in a template.
//!
//! Each call runs one extraction session: the template's Ruby is generated,
//! handed to the external tool, and the result is mapped back. Offenses are
//! relocated through the source map; corrected source goes through the
//! coordinator's correction transfer.

use super::config::{OnError, RubyToolConfig, ToolMode};
use super::executor::{ExecutorError, ToolExecutor, ToolOutput};
use crate::ruby_extraction::{Coordinator, ExtractionError, ExtractionOptions, RandomSuffix, SuffixSource};
use crate::template::ParsedTemplate;
use crate::warning::{LintWarning, Severity};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// `file:line[:col]: rest`
static OFFENSE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<file>.*?):(?P<line>\d+):(?:(?P<col>\d+):)?\s+(?P<rest>.+)$").unwrap());

/// `[C|W|E|F]: [Correctable] Department/Cop: message`
static OFFENSE_DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<sev>[CRWEFI]): )?(?P<corr>\[Correctable\] )?(?:(?P<cop>[A-Z][A-Za-z0-9]*(?:/[A-Za-z0-9]+)+): )?(?P<msg>.*)$",
    )
    .unwrap()
});

/// RuboCop prints the corrected source after this line when both offenses
/// and source end up on stdout.
static SOURCE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^====================\r?\n").unwrap());

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Ruby extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Tool(#[from] ExecutorError),
}

/// Result of an autocorrect run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocorrectOutcome {
    /// The template content with corrections applied.
    pub content: String,
    pub changed: bool,
}

/// An offense as reported for the generated Ruby.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ToolFinding {
    line: usize,
    column: Option<usize>,
    message: String,
    severity: Severity,
    rule_name: Option<String>,
    correctable: bool,
}

pub struct RubyToolProcessor<'a> {
    config: &'a RubyToolConfig,
    extraction: &'a ExtractionOptions,
    executor: ToolExecutor,
}

impl<'a> RubyToolProcessor<'a> {
    pub fn new(config: &'a RubyToolConfig, extraction: &'a ExtractionOptions) -> Self {
        Self {
            config,
            extraction,
            executor: ToolExecutor::new(),
        }
    }

    /// Report the tool's offenses against template lines.
    pub fn lint(&self, template: &ParsedTemplate, path: &str) -> Result<Vec<LintWarning>, ProcessorError> {
        self.lint_with(template, path, &mut RandomSuffix::new())
    }

    pub fn lint_with(
        &self,
        template: &ParsedTemplate,
        path: &str,
        suffixes: &mut dyn SuffixSource,
    ) -> Result<Vec<LintWarning>, ProcessorError> {
        let mut coordinator = Coordinator::new(template, self.extraction.clone());
        let ruby = coordinator.extract_ruby_source(suffixes)?;
        if ruby.source.is_empty() {
            return Ok(Vec::new());
        }

        let Some(output) = self.run(&ruby.source, ToolMode::Lint, path)? else {
            return Ok(Vec::new());
        };

        let findings: Vec<ToolFinding> = parse_tool_output(&output)
            .into_iter()
            .filter(|finding| !coordinator.is_marker_line(finding.line))
            .collect();
        let located = coordinator.map_findings(
            &findings
                .iter()
                .map(|finding| (finding.line, finding.message.clone()))
                .collect::<Vec<_>>(),
        );

        Ok(findings
            .into_iter()
            .zip(located)
            .map(|(finding, (line, message))| LintWarning {
                message,
                line,
                column: finding.column.unwrap_or(1),
                severity: finding.severity,
                rule_name: finding.rule_name,
                correctable: finding.correctable,
            })
            .collect())
    }

    /// Let the tool correct the template's Ruby and carry the result back.
    pub fn autocorrect(&self, template: &ParsedTemplate, path: &str) -> Result<AutocorrectOutcome, ProcessorError> {
        self.autocorrect_with(template, path, &mut RandomSuffix::new())
    }

    pub fn autocorrect_with(
        &self,
        template: &ParsedTemplate,
        path: &str,
        suffixes: &mut dyn SuffixSource,
    ) -> Result<AutocorrectOutcome, ProcessorError> {
        let unchanged = || AutocorrectOutcome {
            content: template.source.clone(),
            changed: false,
        };

        let mut coordinator = Coordinator::new(template, self.extraction.clone());
        let ruby = coordinator.extract_ruby_source(suffixes)?;
        if ruby.source.is_empty() {
            return Ok(unchanged());
        }

        let Some(output) = self.run(&ruby.source, ToolMode::Fix, path)? else {
            return Ok(unchanged());
        };
        let corrected = corrected_source(&output.stdout);
        if corrected == ruby.source {
            return Ok(unchanged());
        }

        let lines = coordinator.template_lines_with_corrections_applied(corrected)?;
        if lines == template.lines {
            return Ok(unchanged());
        }
        Ok(AutocorrectOutcome {
            content: template.render_lines(&lines),
            changed: true,
        })
    }

    /// Run the tool, applying the configured error strategy. `None` means the
    /// failure was tolerated.
    fn run(&self, input: &str, mode: ToolMode, path: &str) -> Result<Option<ToolOutput>, ProcessorError> {
        match self.executor.execute(self.config, input, mode, path) {
            Ok(output) => Ok(Some(output)),
            Err(e) => match self.config.on_error {
                OnError::Fail => Err(e.into()),
                OnError::Skip => Ok(None),
                OnError::Warn => {
                    log::warn!("{path}: {e}");
                    Ok(None)
                }
            },
        }
    }
}

fn parse_tool_output(output: &ToolOutput) -> Vec<ToolFinding> {
    let stdout = &output.stdout;
    let stderr = &output.stderr;
    let combined = format!("{stdout}\n{stderr}");

    combined.lines().filter_map(|line| parse_offense(line.trim())).collect()
}

fn parse_offense(line: &str) -> Option<ToolFinding> {
    let caps = OFFENSE_LINE.captures(line)?;
    let line_num = caps.name("line")?.as_str().parse::<usize>().ok()?;
    let column = caps.name("col").and_then(|col| col.as_str().parse::<usize>().ok());
    let detail = OFFENSE_DETAIL.captures(caps.name("rest")?.as_str())?;

    let message = detail.name("msg")?.as_str().trim().to_string();
    if message.is_empty() {
        return None;
    }
    let severity = match detail.name("sev").map(|sev| sev.as_str()) {
        Some("E" | "F") => Severity::Error,
        Some("W" | "C" | "R") => Severity::Warning,
        Some(_) => Severity::Info,
        None => infer_severity(&message),
    };

    Some(ToolFinding {
        line: line_num,
        column,
        severity,
        rule_name: detail.name("cop").map(|cop| cop.as_str().to_string()),
        correctable: detail.name("corr").is_some(),
        message,
    })
}

fn infer_severity(message: &str) -> Severity {
    let lower = message.to_lowercase();
    if lower.contains("error") {
        Severity::Error
    } else if lower.contains("warning") || lower.contains("warn") {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// The corrected source from the tool's stdout.
fn corrected_source(stdout: &str) -> &str {
    match SOURCE_SEPARATOR.find(stdout) {
        Some(separator) => &stdout[separator.end()..],
        None => stdout,
    }
}
