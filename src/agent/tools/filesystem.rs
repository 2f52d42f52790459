//! Filesystem tools backed by the workspace sandbox.
//!
//! Thin adapters: each tool parses its arguments, delegates to
//! [`Workspace`], and returns the sandbox receipt as JSON. All path policy
//! lives in the sandbox, none here.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::base::{optional_bool, optional_str, optional_u64, require_str, Tool};
use crate::agent::workspace::Workspace;
use crate::errors::ToolError;

const DEFAULT_LIST_MAX_RESULTS: u64 = 200;
const DEFAULT_DESCRIBE_MAX_LINES: u64 = 200;

/// `write_file`: create or overwrite a file inside the workspace.
pub struct WriteFileTool {
    workspace: Arc<Workspace>,
}

impl WriteFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write a text file inside the workspace. Parent directories are created as needed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative file path"
                },
                "content": {
                    "type": "string",
                    "description": "Full file content to write"
                },
                "overwrite": {
                    "type": "boolean",
                    "description": "Replace an existing file (default true)"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let path = require_str(&args, "path")?;
        let content = require_str(&args, "content")?;
        let overwrite = optional_bool(&args, "overwrite", true);

        let receipt = self.workspace.write(&path, &content, overwrite)?;
        Ok(serde_json::to_value(receipt).map_err(|e| ToolError::ExecutionFailed(e.to_string()))?)
    }
}

/// `read_file`: read a file from the workspace.
pub struct ReadFileTool {
    workspace: Arc<Workspace>,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file from the workspace and return its content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Workspace-relative file path"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let path = require_str(&args, "path")?;
        let contents = self.workspace.read(&path)?;
        Ok(serde_json::to_value(contents).map_err(|e| ToolError::ExecutionFailed(e.to_string()))?)
    }
}

/// `list_files`: recursive listing with an optional glob filter.
pub struct ListFilesTool {
    workspace: Arc<Workspace>,
}

impl ListFilesTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in the workspace, optionally filtered by a glob pattern over relative paths."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob over workspace-relative paths, e.g. 'src/*.py'"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum entries returned (default 200)"
                }
            }
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let pattern = optional_str(&args, "pattern");
        let max_results = optional_u64(&args, "max_results", DEFAULT_LIST_MAX_RESULTS) as usize;

        let entries = self.workspace.list(pattern.as_deref(), max_results)?;
        Ok(json!({
            "count": entries.len(),
            "files": entries,
        }))
    }
}

/// `describe_workspace`: indented tree of the workspace contents.
pub struct DescribeWorkspaceTool {
    workspace: Arc<Workspace>,
}

impl DescribeWorkspaceTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for DescribeWorkspaceTool {
    fn name(&self) -> &str {
        "describe_workspace"
    }

    fn description(&self) -> &str {
        "Show the workspace directory tree."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "max_lines": {
                    "type": "integer",
                    "description": "Maximum tree lines returned (default 200)"
                }
            }
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let max_lines = optional_u64(&args, "max_lines", DEFAULT_DESCRIBE_MAX_LINES) as usize;
        let tree = self.workspace.describe(max_lines)?;
        Ok(json!({"tree": tree}))
    }
}
