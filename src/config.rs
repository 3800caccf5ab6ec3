//! Configuration loading.
//!
//! Settings live in `.hamlint.toml` (or `hamlint.toml`). Without an explicit
//! `--config`, the file is searched for from the current directory upward,
//! stopping at the repository root.

use crate::ruby_extraction::ExtractionOptions;
use crate::ruby_tool::RubyToolConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Config file names, in order of precedence
pub const CONFIG_FILES: &[&str] = &[".hamlint.toml", "hamlint.toml"];

const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub global: GlobalConfig,
    pub ruby_tool: RubyToolConfig,
    pub extraction: ExtractionOptions,
}

/// File selection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct GlobalConfig {
    /// Glob patterns of files to lint; empty means every `*.haml`
    pub include: Vec<String>,
    /// Glob patterns of files or directories to skip
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            respect_gitignore: true,
        }
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: String, message: String },

    /// Configuration file already exists
    #[error("Configuration file already exists at {path}")]
    FileExists { path: String },
}

impl Config {
    /// Load the explicit config file, or the discovered one, or defaults.
    /// Returns the config and the file it came from.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir()
                .ok()
                .and_then(|dir| discover_config_upward(&dir)),
        };

        match path {
            Some(path) => {
                let config = Self::from_file(&path)?;
                log::debug!("loaded config from {}", path.display());
                Ok((config, Some(path)))
            }
            None => {
                log::debug!("no config file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

/// Walk up from `start` looking for a config file. The search ends at the
/// first directory containing `.git`.
pub fn discover_config_upward(start: &Path) -> Option<PathBuf> {
    let mut current_dir = start.to_path_buf();

    for _ in 0..MAX_DEPTH {
        log::trace!("searching for config in {}", current_dir.display());
        for name in CONFIG_FILES {
            let candidate = current_dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if current_dir.join(".git").exists() {
            log::trace!("stopping at .git directory");
            return None;
        }
        current_dir = current_dir.parent()?.to_path_buf();
    }

    None
}

/// Write a commented default configuration to `path`.
pub fn create_default_config(path: &str) -> Result<(), ConfigError> {
    if Path::new(path).exists() {
        return Err(ConfigError::FileExists { path: path.to_string() });
    }

    let default_config = r#"# hamlint configuration file

[global]
# Glob patterns of templates to lint (default: every *.haml file)
# include = ["app/views/**/*.haml"]

# Glob patterns to skip
exclude = ["vendor", "node_modules", "tmp"]

# Skip files ignored by .gitignore
respect-gitignore = true

[ruby-tool]
# The tool reads the generated Ruby on stdin; {path} is the template path
command = ["rubocop"]
lint-args = ["--stdin", "{path}", "--format", "emacs"]
fix-args = ["--stdin", "{path}", "--autocorrect", "--stderr", "--format", "quiet"]

# Milliseconds per run, 0 disables the timeout
timeout = 30000

# What to do when the tool fails: "fail", "skip" or "warn"
on-error = "fail"

[extraction]
# Attempts at finding marker prefixes that do not occur in a template
max-prefix-attempts = 100

# Filters whose content is Ruby
code-filters = ["ruby"]
"#;

    fs::write(path, default_config).map_err(|source| ConfigError::IoError {
        source,
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruby_tool::OnError;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.global.respect_gitignore);
        assert!(config.global.include.is_empty());
        assert_eq!(config.extraction.max_prefix_attempts, 100);
        assert_eq!(config.ruby_tool.binary(), Some("rubocop"));
    }

    #[test]
    fn test_parse_sections() {
        let config = Config::from_toml_str(
            r#"
[global]
exclude = ["vendor"]
respect-gitignore = false

[ruby-tool]
command = ["bundle", "exec", "rubocop"]
on-error = "skip"

[extraction]
code-filters = ["ruby", "erb"]
"#,
        )
        .unwrap();
        assert_eq!(config.global.exclude, vec!["vendor"]);
        assert!(!config.global.respect_gitignore);
        assert_eq!(config.ruby_tool.command, vec!["bundle", "exec", "rubocop"]);
        assert_eq!(config.ruby_tool.on_error, OnError::Skip);
        assert_eq!(config.ruby_tool.timeout, 30_000);
        assert_eq!(config.extraction.code_filters, vec!["ruby", "erb"]);
        assert_eq!(config.extraction.max_prefix_attempts, 100);
    }

    #[test]
    fn test_parse_error() {
        assert!(Config::from_toml_str("[ruby-tool]\ntimeout = \"soon\"\n").is_err());
    }

    #[test]
    fn test_discover_config_upward() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("app/views")).unwrap();
        fs::write(root.join(".hamlint.toml"), "").unwrap();

        let found = discover_config_upward(&root.join("app/views")).unwrap();
        assert_eq!(found, root.join(".hamlint.toml"));
    }

    #[test]
    fn test_discover_stops_at_git_root() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".hamlint.toml"), "").unwrap();
        let project = root.join("project");
        fs::create_dir_all(project.join(".git")).unwrap();

        assert_eq!(discover_config_upward(&project), None);
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(".hamlint.toml");
        let path = path.to_str().unwrap();

        create_default_config(path).unwrap();
        let config = Config::from_file(Path::new(path)).unwrap();
        assert_eq!(config.global.exclude, vec!["vendor", "node_modules", "tmp"]);
        assert_eq!(config.ruby_tool, RubyToolConfig::default());

        assert!(matches!(create_default_config(path), Err(ConfigError::FileExists { .. })));
    }
}
