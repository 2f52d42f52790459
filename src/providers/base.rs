//! Base LLM provider interface.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments of a tool call as they arrive from the wire.
///
/// Completion APIs deliver function arguments either as a JSON-encoded string
/// or (for some servers) as an already-structured object. The duality stops
/// at the tool executor, which normalizes to a parsed map before any tool
/// sees the arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Parsed(Map<String, Value>),
    Raw(String),
}

impl ToolArguments {
    /// Empty parsed arguments.
    pub fn empty() -> Self {
        ToolArguments::Parsed(Map::new())
    }
}

/// A tool call request from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    /// Convert to OpenAI function-call JSON format for history append.
    ///
    /// The `id` is echoed verbatim so the model can correlate the tool
    /// result message that follows.
    pub fn to_openai_json(&self) -> Value {
        let arguments = match &self.arguments {
            ToolArguments::Raw(s) => s.clone(),
            ToolArguments::Parsed(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
            }
        };
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": arguments,
            }
        })
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: String,
    pub usage: HashMap<String, i64>,
}

impl LLMResponse {
    /// Check if response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether the completion was cut off by the provider's length limit.
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == "length"
    }
}

/// Abstract base trait for LLM providers.
///
/// Implementations handle the specifics of each endpoint while keeping a
/// consistent interface. Transport failures (unreachable endpoint, non-2xx)
/// are returned as `Err` and treated as fatal by the caller.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` - Message objects with `role` and `content`.
    /// * `tools` - Optional tool definitions in OpenAI function format.
    /// * `tool_choice` - `"auto"`, `"required"`, or `None` to omit.
    /// * `max_tokens` - Maximum tokens in the response.
    /// * `temperature` - Sampling temperature.
    async fn chat(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
        tool_choice: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<LLMResponse>;

    /// Get the default model for this provider.
    fn get_default_model(&self) -> &str;
}
