//! Runs the external Ruby tool via stdin/stdout.
//!
//! Output pipes are drained on reader threads so a chatty tool cannot block
//! on a full pipe while we wait for it, and the wait is bounded by the
//! configured timeout.

use super::config::{RubyToolConfig, ToolMode};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Result of executing the tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, -1 when the process was terminated by a signal.
    pub exit_code: i32,
}

#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("Tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },
    #[error("Tool '{tool}' failed: {message}")]
    ExecutionFailed { tool: String, message: String },
    #[error("Tool '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },
    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Executor for the external tool.
///
/// Availability checks are cached, so one executor can be shared by all files
/// of a run.
#[derive(Clone)]
pub struct ToolExecutor {
    /// tool name -> available
    tool_cache: Arc<Mutex<HashMap<String, bool>>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self {
            tool_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if a tool is available (lazy, cached).
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        if let Ok(cache) = self.tool_cache.lock()
            && let Some(&available) = cache.get(tool_name)
        {
            return available;
        }

        let available = check_tool_exists(tool_name);
        if let Ok(mut cache) = self.tool_cache.lock() {
            cache.insert(tool_name.to_string(), available);
        }
        available
    }

    /// Run the tool on `input` for the template at `path`.
    pub fn execute(
        &self,
        config: &RubyToolConfig,
        input: &str,
        mode: ToolMode,
        path: &str,
    ) -> Result<ToolOutput, ExecutorError> {
        let Some(tool_name) = config.binary() else {
            return Err(ExecutorError::ExecutionFailed {
                tool: "unknown".to_string(),
                message: "Empty command".to_string(),
            });
        };

        if !self.is_tool_available(tool_name) {
            return Err(ExecutorError::ToolNotFound {
                tool: tool_name.to_string(),
            });
        }

        let args = config.arguments(mode, path);
        log::debug!("running {tool_name} {}", args.join(" "));

        let mut child = Command::new(tool_name)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutorError::IoError {
                message: format!("Failed to spawn '{tool_name}': {e}"),
            })?;

        let mut stdout_handle = child
            .stdout
            .take()
            .map(|stdout| thread::spawn(move || read_pipe_to_string(stdout)));
        let mut stderr_handle = child
            .stderr
            .take()
            .map(|stderr| thread::spawn(move || read_pipe_to_string(stderr)));

        if let Some(mut stdin) = child.stdin.take() {
            // A tool that exits without reading its input closes the pipe early
            if let Err(e) = stdin.write_all(input.as_bytes())
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(ExecutorError::IoError {
                    message: format!("Failed to write to stdin: {e}"),
                });
            }
        }

        let timeout = Duration::from_millis(config.timeout);
        let status = if timeout.is_zero() {
            child.wait().map_err(|e| ExecutorError::IoError {
                message: format!("Failed to wait for '{tool_name}': {e}"),
            })?
        } else {
            let start = Instant::now();
            loop {
                if let Some(status) = child.try_wait().map_err(|e| ExecutorError::IoError {
                    message: format!("Failed to poll '{tool_name}': {e}"),
                })? {
                    break status;
                }
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = join_reader(stdout_handle.take());
                    let _ = join_reader(stderr_handle.take());
                    return Err(ExecutorError::Timeout {
                        tool: tool_name.to_string(),
                        timeout_ms: config.timeout,
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
        };

        let stdout = join_reader(stdout_handle.take()).map_err(|e| ExecutorError::IoError { message: e })?;
        let stderr = join_reader(stderr_handle.take()).map_err(|e| ExecutorError::IoError { message: e })?;
        let exit_code = status.code().unwrap_or(-1);

        if !config.success_exit_codes.contains(&exit_code) {
            return Err(ExecutorError::ExecutionFailed {
                tool: tool_name.to_string(),
                message: format!("Exit code {exit_code}: {}", stderr.trim()),
            });
        }

        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn check_tool_exists(tool_name: &str) -> bool {
    // Explicit paths are checked directly
    if tool_name.contains(std::path::MAIN_SEPARATOR) {
        return std::path::Path::new(tool_name).is_file();
    }

    #[cfg(unix)]
    let finder = "which";
    #[cfg(windows)]
    let finder = "where";

    Command::new(finder)
        .arg(tool_name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn read_pipe_to_string<R: Read>(mut pipe: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).to_string())
}

fn join_reader(handle: Option<thread::JoinHandle<std::io::Result<String>>>) -> Result<String, String> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(res) => res.map_err(|e| format!("Failed to read output: {e}")),
            Err(_) => Err("Output reader thread panicked".to_string()),
        },
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(command: &[&str]) -> RubyToolConfig {
        RubyToolConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            lint_args: vec![],
            fix_args: vec![],
            ..Default::default()
        }
    }

    #[test]
    fn test_tool_not_found() {
        let executor = ToolExecutor::default();
        let result = executor.execute(&tool(&["nonexistent-tool-xyz123"]), "x", ToolMode::Lint, "a.haml");
        assert!(matches!(result, Err(ExecutorError::ToolNotFound { .. })));
    }

    #[test]
    fn test_empty_command() {
        let executor = ToolExecutor::default();
        let result = executor.execute(&tool(&[]), "x", ToolMode::Lint, "a.haml");
        assert!(matches!(result, Err(ExecutorError::ExecutionFailed { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_execute_cat() {
        let executor = ToolExecutor::default();
        let output = executor
            .execute(&tool(&["cat"]), "hello world\n", ToolMode::Fix, "a.haml")
            .expect("cat should succeed");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "hello world\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_path_substitution_reaches_tool() {
        let executor = ToolExecutor::default();
        let mut config = tool(&["echo"]);
        config.lint_args = vec!["{path}".to_string()];
        let output = executor
            .execute(&config, "", ToolMode::Lint, "views/index.haml")
            .expect("echo should succeed");
        assert_eq!(output.stdout.trim(), "views/index.haml");
    }

    #[test]
    #[cfg(unix)]
    fn test_unexpected_exit_code() {
        let executor = ToolExecutor::default();
        let mut config = tool(&["sh", "-c", "exit 3"]);
        config.success_exit_codes = vec![0];
        let result = executor.execute(&config, "", ToolMode::Lint, "a.haml");
        assert!(matches!(result, Err(ExecutorError::ExecutionFailed { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_timeout() {
        let executor = ToolExecutor::default();
        let mut config = tool(&["sleep", "2"]);
        config.timeout = 20;
        let result = executor.execute(&config, "", ToolMode::Lint, "a.haml");
        assert!(matches!(result, Err(ExecutorError::Timeout { timeout_ms: 20, .. })));
    }
}
