//! Shell tool — execute system commands.
//!
//! Runs the command under the detected shell flavor in the context's
//! working directory, with a timeout and cooperative cancellation.

use async_trait::async_trait;
use shellwright_core::{
    FieldKind, InputSchema, Tool, ToolContext, ToolError, ToolResult, ValidatedInput,
};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_OUTPUT_CHARS: usize = 30_000;

/// Execute shell commands.
pub struct ShellTool {
    default_timeout: Duration,
}

impl ShellTool {
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the project directory and return stdout/stderr. Use this for running programs, builds, tests, git operations, etc."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("command", FieldKind::String, "The shell command to execute")
            .optional("timeout_secs", FieldKind::Integer, "Seconds before the command is killed")
    }

    async fn execute(&self, input: ValidatedInput, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let command = input.str("command").unwrap_or_default();
        if command.trim().is_empty() {
            return Err(ToolError::InvalidArguments("'command' must not be empty".into()));
        }

        let timeout = input
            .i64("timeout_secs")
            .filter(|s| *s > 0)
            .map(|s| Duration::from_secs(s as u64))
            .unwrap_or(self.default_timeout);

        let (program, args) = ctx.shell.command_line(command);
        debug!(command = %command, shell = %program, cwd = %ctx.cwd.display(), "Executing shell command");

        let child = Command::new(&program)
            .args(&args)
            .current_dir(&ctx.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "shell".into(),
                reason: format!("failed to start {program}: {e}"),
            })?;

        let output = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                return Err(ToolError::Cancelled(command.to_string()));
            }
            waited = tokio::time::timeout(timeout, child.wait_with_output()) => match waited {
                Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "shell".into(),
                    reason: e.to_string(),
                })?,
                Err(_) => {
                    return Err(ToolError::Timeout {
                        tool_name: "shell".into(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            let text = if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            };
            Ok(ToolResult::success(truncate(text.trim())))
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            let text = format!("[exit code: {code}]\n{stdout}\n{stderr}");
            Ok(ToolResult::error(truncate(text.trim())))
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_OUTPUT_CHARS {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
    format!("{kept}\n[output truncated at {MAX_OUTPUT_CHARS} characters]")
}
