//! OpenAI-compatible API provider.
//!
//! Talks to any endpoint that implements the OpenAI chat completions format:
//! LM Studio, vLLM, OpenRouter, OpenAI itself. Transport failures and non-2xx
//! statuses are returned as [`ProviderError`]; the conversation controller
//! treats them as fatal rather than retrying.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::base::{LLMProvider, LLMResponse, ToolArguments, ToolCallRequest};
use crate::errors::ProviderError;

/// An LLM provider that talks to an OpenAI-compatible chat completions
/// endpoint.
pub struct OpenAiCompatProvider {
    api_key: String,
    api_base: String,
    default_model: String,
    client: Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider for the given endpoint.
    pub fn new(api_base: &str, api_key: &str, default_model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model: default_model.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAiCompatProvider {
    async fn chat(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
        tool_choice: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<LLMResponse> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut body = serde_json::json!({
            "model": self.default_model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });
        if let Some(tool_defs) = tools {
            if !tool_defs.is_empty() {
                body["tools"] = Value::Array(tool_defs.to_vec());
                body["tool_choice"] = serde_json::json!(tool_choice.unwrap_or("auto"));
            }
        }

        debug!("chat: url={} model={}", url, self.default_model);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::ResponseReadError(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                message: response_text,
            }
            .into());
        }

        let data: Value = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::JsonParseError(e.to_string()))?;

        Ok(parse_response(&data))
    }

    fn get_default_model(&self) -> &str {
        &self.default_model
    }
}

/// Parse the OpenAI-compatible JSON response into an [`LLMResponse`].
///
/// Tolerant of missing fields: an empty choices array yields an empty `stop`
/// response rather than an error, and tool-call argument strings are kept
/// raw for the executor to normalize.
pub(crate) fn parse_response(data: &Value) -> LLMResponse {
    let choice = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .cloned()
        .unwrap_or_default();

    let message = choice.get("message").cloned().unwrap_or_default();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let mut tool_calls = Vec::new();
    if let Some(tc_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_array {
            let name = tc
                .get("function")
                .and_then(|f| f.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            // The model is expected to supply a correlation id; fall back to
            // the tool name when it is absent so the result message can still
            // echo something stable.
            let id = tc
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .unwrap_or_else(|| name.clone());

            let arguments = match tc.get("function").and_then(|f| f.get("arguments")) {
                Some(Value::String(s)) => ToolArguments::Raw(s.clone()),
                Some(Value::Object(map)) => ToolArguments::Parsed(map.clone()),
                _ => ToolArguments::empty(),
            };

            tool_calls.push(ToolCallRequest {
                id,
                name,
                arguments,
            });
        }
    }

    let mut usage = HashMap::new();
    if let Some(u) = data.get("usage").and_then(|v| v.as_object()) {
        for (k, v) in u {
            if let Some(n) = v.as_i64() {
                usage.insert(k.clone(), n);
            }
        }
    }

    LLMResponse {
        content,
        tool_calls,
        finish_reason,
        usage,
    }
}
