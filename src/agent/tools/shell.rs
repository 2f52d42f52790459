//! Shell tool: non-interactive command execution inside the workspace.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use super::base::{optional_str, optional_u64, require_str, Tool};
use crate::agent::workspace::Workspace;
use crate::errors::{ToolError, WorkspaceError};

/// Stdout/stderr are tailed to this many characters before being fed back
/// to the model.
const OUTPUT_TAIL_CHARS: usize = 10_000;

/// `run_shell`: run a command via `sh -c` with a hard timeout.
///
/// The working directory is resolved through the workspace sandbox, so a
/// `cwd` argument cannot point outside the root. Commands themselves are
/// not inspected; confinement is by working directory and timeout only.
pub struct RunShellTool {
    workspace: Arc<Workspace>,
    default_timeout_sec: u64,
}

impl RunShellTool {
    pub fn new(workspace: Arc<Workspace>, default_timeout_sec: u64) -> Self {
        Self {
            workspace,
            default_timeout_sec,
        }
    }
}

#[async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Run a non-interactive shell command inside the workspace and return its output."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command line passed to sh -c"
                },
                "timeout_sec": {
                    "type": "integer",
                    "description": "Seconds before the command is killed (default 20)"
                },
                "cwd": {
                    "type": "string",
                    "description": "Workspace-relative working directory (default workspace root)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let command = require_str(&args, "command")?;
        let timeout_sec = optional_u64(&args, "timeout_sec", self.default_timeout_sec);
        let cwd_arg = optional_str(&args, "cwd");

        let cwd = match cwd_arg.as_deref() {
            Some(rel) => {
                let dir = self.workspace.resolve(rel)?;
                if !dir.is_dir() {
                    return Err(WorkspaceError::NotFound(rel.to_string()).into());
                }
                dir
            }
            None => self.workspace.root().to_path_buf(),
        };

        debug!(command = %command, cwd = %cwd.display(), timeout_sec, "running shell command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to spawn shell: {}", e)))?;

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::ExecutionFailed("missing stdout pipe".to_string()))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| ToolError::ExecutionFailed("missing stderr pipe".to_string()))?;

        // Drain both streams concurrently so a chatty command cannot block
        // on a full pipe; partial output survives a kill.
        let stdout_task = tokio::spawn(read_to_string(stdout_pipe));
        let stderr_task = tokio::spawn(read_to_string(stderr_pipe));

        let waited = tokio::time::timeout(Duration::from_secs(timeout_sec), child.wait()).await;

        match waited {
            Ok(Ok(status)) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                let exit_code = status.code().unwrap_or(-1);

                let mut result = json!({
                    "status": if exit_code == 0 { "success" } else { "error" },
                    "exit_code": exit_code,
                    "stdout": tail(&stdout, OUTPUT_TAIL_CHARS),
                    "stderr": tail(&stderr, OUTPUT_TAIL_CHARS),
                    "cwd": cwd.display().to_string(),
                    "command": command,
                });
                if exit_code != 0 {
                    result["message"] = json!(format!("command exited with code {}", exit_code));
                }
                Ok(result)
            }
            Ok(Err(e)) => Err(ToolError::ExecutionFailed(format!(
                "failed to wait on shell: {}",
                e
            ))),
            Err(_) => {
                let _ = child.kill().await;
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                Ok(json!({
                    "status": "error",
                    "message": format!("timeout after {}s", timeout_sec),
                    "error_type": "TimeoutError",
                    "stdout": tail(&stdout, OUTPUT_TAIL_CHARS),
                    "stderr": tail(&stderr, OUTPUT_TAIL_CHARS),
                    "command": command,
                }))
            }
        }
    }
}

async fn read_to_string(mut pipe: impl AsyncReadExt + Unpin) -> String {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Last `cap` characters of `s`, respecting char boundaries.
fn tail(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        return s.to_string();
    }
    let mut start = s.len() - cap;
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}
