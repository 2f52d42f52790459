//! Tool executor: bridges model-issued tool calls to registered tools.
//!
//! The executor guarantees the conversation controller never observes an
//! unhandled fault from tool code: argument parse failures, unknown names,
//! tool errors, and panics all come back as a normalized [`ToolResult`]
//! which is serialized into the tool message fed to the model.

use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::tools::registry::ToolRegistry;
use crate::providers::base::ToolArguments;

/// Normalized outcome of one tool invocation.
///
/// Invariant: exactly one of `data`/`error` is `Some`, consistent with `ok`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub tool: String,
    pub args: Map<String, Value>,
    pub status: String,
    pub ok: bool,
    pub data: Option<Value>,
    pub error: Option<ToolResultError>,
}

/// Structured error payload inside a [`ToolResult`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolResultError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl ToolResult {
    fn success(tool: &str, args: Map<String, Value>, data: Value) -> Self {
        Self {
            tool: tool.to_string(),
            args,
            status: "success".to_string(),
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(tool: &str, args: Map<String, Value>, error_type: &str, message: String) -> Self {
        Self {
            tool: tool.to_string(),
            args,
            status: "error".to_string(),
            ok: false,
            data: None,
            error: Some(ToolResultError {
                error_type: error_type.to_string(),
                message,
                extra: None,
            }),
        }
    }

    /// Serialize for the `content` of a `tool` role message.
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"status\":\"error\",\"ok\":false,\"error\":{{\"type\":\"SerializationError\",\"message\":\"{}\"}}}}",
                e
            )
        })
    }
}

/// Executes tool calls against a registry, normalizing every outcome.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Execute a tool call. Never fails: every fault becomes a normalized
    /// error result the model can react to.
    pub async fn execute(&self, name: &str, arguments: ToolArguments) -> ToolResult {
        // Normalize the string-or-object duality first; nothing downstream
        // branches on representation.
        let args = match normalize_arguments(arguments) {
            Ok(map) => map,
            Err(message) => {
                return ToolResult::failure(name, Map::new(), "ArgumentParseError", message);
            }
        };

        let tool = match self.registry.get(name) {
            Some(t) => t,
            None => {
                return ToolResult::failure(
                    name,
                    args,
                    "LookupError",
                    format!("Unknown tool '{}'", name),
                );
            }
        };

        debug!("executing tool '{}'", name);

        let fut = std::panic::AssertUnwindSafe(tool.execute(args.clone()));
        match fut.catch_unwind().await {
            Ok(Ok(value)) => normalize_success(name, args, value),
            Ok(Err(e)) => {
                warn!("tool '{}' failed: {}", name, e);
                ToolResult::failure(name, args, e.error_type(), e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic);
                warn!("tool '{}' panicked: {}", name, message);
                ToolResult::failure(name, args, "PanicError", message)
            }
        }
    }
}

/// Parse raw string arguments as a JSON object; already-parsed maps pass
/// through. An empty raw string means "no arguments".
fn normalize_arguments(arguments: ToolArguments) -> Result<Map<String, Value>, String> {
    match arguments {
        ToolArguments::Parsed(map) => Ok(map),
        ToolArguments::Raw(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Map::new());
            }
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| format!("Invalid JSON arguments: {}", e))?;
            match value {
                Value::Object(map) => Ok(map),
                other => Err(format!(
                    "Invalid JSON arguments: expected an object, got {}",
                    type_name(&other)
                )),
            }
        }
    }
}

/// Wrap a tool's return value, honoring a `status` field the tool set
/// itself: tools that report their own success/error signal keep it, the
/// executor does not overwrite it.
fn normalize_success(name: &str, args: Map<String, Value>, value: Value) -> ToolResult {
    let own_status = value
        .as_object()
        .and_then(|o| o.get("status"))
        .and_then(|s| s.as_str());

    if own_status == Some("error") {
        let obj = value.as_object().cloned().unwrap_or_default();
        let message = obj
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("tool reported an error")
            .to_string();
        let error_type = obj
            .get("error_type")
            .and_then(|t| t.as_str())
            .unwrap_or("ExecutionError")
            .to_string();
        let mut result = ToolResult::failure(name, args, &error_type, message);
        if let Some(err) = result.error.as_mut() {
            err.extra = Some(value);
        }
        return result;
    }

    ToolResult::success(name, args, value)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked during execution".to_string()
    }
}
