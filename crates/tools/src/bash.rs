//! Bash tool — execute shell commands.
//!
//! The destructive-command confirmation gate lives in the invoke step,
//! not here; this tool runs whatever reaches it.

use async_trait::async_trait;
use gloop_core::{Tool, ToolArg, ToolArgs, ToolError};
use tokio::process::Command;
use tracing::{debug, warn};

pub struct BashTool;

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "Bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Use for running programs, \
         inspecting files, git operations, and spawning subagents."
    }

    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("command", "The shell command to execute")]
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let command = args
            .get("command")
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        debug!(command = %command, "executing shell command");

        let output = Command::new("sh")
            .args(["-c", command])
            .output()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "Bash".into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            let combined = if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            };
            Ok(combined.trim().to_string())
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "command failed");
            Err(ToolError::ExecutionFailed {
                tool_name: "Bash".into(),
                reason: format!("[exit code: {code}]\n{stdout}\n{stderr}")
                    .trim()
                    .to_string(),
            })
        }
    }
}
