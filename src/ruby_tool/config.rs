//! Configuration for the external Ruby tool.
//!
//! The tool reads the generated Ruby on stdin. `{path}` in the argument lists
//! is replaced with the template's path so the tool can pick up its own
//! project configuration.

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the template path in tool arguments.
pub const PATH_PLACEHOLDER: &str = "{path}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RubyToolConfig {
    /// Command to run (first element is the binary, rest are base arguments)
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Extra arguments when reporting offenses
    #[serde(default = "default_lint_args")]
    pub lint_args: Vec<String>,

    /// Extra arguments when autocorrecting; the corrected source must be
    /// written to stdout
    #[serde(default = "default_fix_args")]
    pub fix_args: Vec<String>,

    /// Timeout per tool execution in milliseconds, 0 disables it (default: 30000)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Error handling strategy
    #[serde(default)]
    pub on_error: OnError,

    /// Exit codes that do not count as a tool failure
    #[serde(default = "default_success_exit_codes")]
    pub success_exit_codes: Vec<i32>,
}

fn default_command() -> Vec<String> {
    vec!["rubocop".to_string()]
}

fn default_lint_args() -> Vec<String> {
    ["--stdin", PATH_PLACEHOLDER, "--format", "emacs"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fix_args() -> Vec<String> {
    ["--stdin", PATH_PLACEHOLDER, "--autocorrect", "--stderr", "--format", "quiet"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_timeout() -> u64 {
    30_000
}

fn default_success_exit_codes() -> Vec<i32> {
    // RuboCop exits with 1 when it found offenses
    vec![0, 1]
}

impl Default for RubyToolConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            lint_args: default_lint_args(),
            fix_args: default_fix_args(),
            timeout: default_timeout(),
            on_error: OnError::default(),
            success_exit_codes: default_success_exit_codes(),
        }
    }
}

impl RubyToolConfig {
    /// Full argument list (without the binary) for a run on `path`.
    pub fn arguments(&self, mode: ToolMode, path: &str) -> Vec<String> {
        let extra = match mode {
            ToolMode::Lint => &self.lint_args,
            ToolMode::Fix => &self.fix_args,
        };
        self.command
            .iter()
            .skip(1)
            .chain(extra)
            .map(|arg| arg.replace(PATH_PLACEHOLDER, path))
            .collect()
    }

    pub fn binary(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

/// What the tool is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Lint,
    Fix,
}

/// Error handling strategy for tool execution failures.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OnError {
    /// Fail the file (propagate error)
    #[default]
    Fail,
    /// Leave the file alone and continue silently
    Skip,
    /// Log a warning but continue processing
    Warn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RubyToolConfig::default();
        assert_eq!(config.binary(), Some("rubocop"));
        assert_eq!(config.timeout, 30_000);
        assert_eq!(config.on_error, OnError::Fail);
        assert_eq!(config.success_exit_codes, vec![0, 1]);
    }

    #[test]
    fn test_deserialize_config() {
        let toml = r#"
command = ["bundle", "exec", "rubocop"]
lint-args = ["--stdin", "{path}"]
timeout = 5000
on-error = "warn"
"#;
        let config: RubyToolConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.command, vec!["bundle", "exec", "rubocop"]);
        assert_eq!(config.timeout, 5000);
        assert_eq!(config.on_error, OnError::Warn);
        // Unset fields keep their defaults
        assert_eq!(config.fix_args, default_fix_args());
    }

    #[test]
    fn test_arguments_substitute_path() {
        let config = RubyToolConfig {
            command: vec!["bundle".to_string(), "exec".to_string(), "rubocop".to_string()],
            ..Default::default()
        };
        assert_eq!(
            config.arguments(ToolMode::Lint, "app/views/show.haml"),
            vec!["exec", "rubocop", "--stdin", "app/views/show.haml", "--format", "emacs"]
        );
        let fix = config.arguments(ToolMode::Fix, "a.haml");
        assert!(fix.contains(&"--autocorrect".to_string()));
        assert!(fix.contains(&"a.haml".to_string()));
    }

    #[test]
    fn test_on_error_variants() {
        for (text, expected) in [("fail", OnError::Fail), ("skip", OnError::Skip), ("warn", OnError::Warn)] {
            let config: RubyToolConfig = toml::from_str(&format!("on-error = \"{text}\"")).unwrap();
            assert_eq!(config.on_error, expected);
        }
    }
}
