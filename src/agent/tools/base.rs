//! Base trait for agent tools.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::ToolError;

/// Abstract base trait for agent tools.
///
/// Tools are capabilities the model can request, such as writing files or
/// running shell commands. They return an explicit `Result` instead of
/// raising: expected failures come back as [`ToolError`], and the executor
/// normalizes both arms into the result fed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls.
    fn name(&self) -> &str;

    /// Description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for tool parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with parsed arguments.
    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError>;

    /// Convert tool to OpenAI function schema format.
    fn to_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

/// Extract a required string argument.
pub fn require_str(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ToolError::InvalidArgs(format!("'{}' parameter is required", key)))
}

/// Extract an optional string argument.
pub fn optional_str(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Extract an optional unsigned integer argument with a default.
pub fn optional_u64(args: &Map<String, Value>, key: &str, default: u64) -> u64 {
    args.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
}

/// Extract an optional boolean argument with a default.
pub fn optional_bool(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}
