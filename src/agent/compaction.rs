//! History compaction via an auxiliary LLM call.
//!
//! When a completion is cut off by the context-length limit and the model
//! produced no tool calls, the conversation controller asks this module to
//! shrink the history. Older messages are compressed by a secondary model
//! call that must answer through a dedicated `return_compacted_history`
//! function tool (structured output, not free text) while the most recent
//! `keep_last_n` messages are carried over untouched. Every failure path
//! degrades to a crude one-message summary so a run is never blocked on
//! compaction.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::providers::base::{LLMProvider, ToolArguments};

/// System prompt for the summarization call.
const COMPACT_SYSTEM_PROMPT: &str = "\
You compress chat history for an agent. Return compact messages that retain \
all essential goals, constraints, decisions, file paths, and commands. \
Preserve meaning and intent. Do not invent content. You must answer by \
calling the return_compacted_history function with the compacted messages.";

/// Instructions embedded in the user message alongside the head.
const COMPACT_INSTRUCTIONS: &str = "\
Summarize 'head' into the fewest messages needed. Keep roles as \
'system'/'user'/'assistant' only. Do not remove important user requests; \
condense them faithfully. Preserve goals, constraints, decisions, file \
paths, commands, ids, and any numeric parameters. Be terse and avoid \
repetition. When a message in 'head' has role 'tool' and contains JSON or \
code-like output, do not include the raw content; state the outcome in one \
short line instead.";

/// Fallback summary used when the auxiliary call fails in any way.
const CRUDE_SUMMARY: &str =
    "Condensed earlier context. Key points retained; refer to prior goals and constraints.";

/// Max tokens granted to the summarization response.
const SUMMARY_MAX_TOKENS: u32 = 800;

/// Whether the compacted history came from the model or the crude fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStatus {
    Success,
    Error,
}

/// Result of a compaction attempt. `messages` is always usable.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub status: CompactionStatus,
    pub messages: Vec<Value>,
}

/// Compacts conversation history through an auxiliary model call.
pub struct HistoryCompactor {
    provider: Arc<dyn LLMProvider>,
}

impl HistoryCompactor {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Compact `messages`, keeping the last `keep_last_n` untouched.
    ///
    /// The tail is never summarized, dropped, or reordered; it is the
    /// caller's continuity guarantee for the most recent turns.
    pub async fn compact(&self, messages: &[Value], keep_last_n: usize) -> CompactionOutcome {
        let split = messages.len().saturating_sub(keep_last_n);
        let (head, tail) = messages.split_at(split);

        if head.is_empty() {
            // Nothing older than the tail; there is nothing to compress.
            return CompactionOutcome {
                status: CompactionStatus::Success,
                messages: messages.to_vec(),
            };
        }

        debug!(
            "compacting {} head messages, keeping last {}",
            head.len(),
            tail.len()
        );

        match self.summarize_head(head).await {
            Ok(mut compacted) => {
                compacted.extend_from_slice(tail);
                CompactionOutcome {
                    status: CompactionStatus::Success,
                    messages: compacted,
                }
            }
            Err(e) => {
                warn!("history compaction failed, using crude fallback: {}", e);
                let mut crude = vec![json!({"role": "system", "content": CRUDE_SUMMARY})];
                crude.extend_from_slice(tail);
                CompactionOutcome {
                    status: CompactionStatus::Error,
                    messages: crude,
                }
            }
        }
    }

    /// One auxiliary model call compressing `head` into fewer messages,
    /// returned through the `return_compacted_history` tool.
    async fn summarize_head(&self, head: &[Value]) -> anyhow::Result<Vec<Value>> {
        // Only role/content reach the summarizer; tool plumbing fields are
        // noise at this point.
        let slim_head: Vec<Value> = head
            .iter()
            .filter_map(|m| {
                let role = m.get("role").and_then(|r| r.as_str())?;
                let content = m.get("content").and_then(|c| c.as_str()).unwrap_or("");
                Some(json!({"role": role, "content": content}))
            })
            .collect();

        let user_payload = json!({
            "head": slim_head,
            "instructions": COMPACT_INSTRUCTIONS,
        });

        let request = vec![
            json!({"role": "system", "content": COMPACT_SYSTEM_PROMPT}),
            json!({"role": "user", "content": user_payload.to_string()}),
        ];
        let tools = vec![compacted_history_schema()];

        let response = self
            .provider
            .chat(&request, Some(&tools), Some("required"), SUMMARY_MAX_TOKENS, 0.1)
            .await?;

        let call = response
            .tool_calls
            .first()
            .ok_or_else(|| anyhow::anyhow!("no tool_calls returned by summarizer"))?;

        let args = match &call.arguments {
            ToolArguments::Parsed(map) => map.clone(),
            ToolArguments::Raw(s) => serde_json::from_str(s)?,
        };

        let raw_messages = args
            .get("messages")
            .and_then(|m| m.as_array())
            .ok_or_else(|| anyhow::anyhow!("missing 'messages' array in summarizer reply"))?;

        let clean: Vec<Value> = raw_messages
            .iter()
            .filter_map(|m| {
                let role = m.get("role").and_then(|r| r.as_str())?;
                if !matches!(role, "system" | "user" | "assistant") {
                    return None;
                }
                let content = m.get("content").and_then(|c| c.as_str())?;
                Some(json!({"role": role, "content": content}))
            })
            .collect();

        if clean.is_empty() {
            anyhow::bail!("empty compacted history");
        }
        Ok(clean)
    }
}

/// Schema of the structured call-back tool the summarizer must use.
fn compacted_history_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "return_compacted_history",
            "description": "Return the compacted chat history. You must call this function with the compacted 'messages' array and no free-form text.",
            "parameters": {
                "type": "object",
                "properties": {
                    "messages": {
                        "type": "array",
                        "description": "Compacted chat messages in order.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "role": {"type": "string", "enum": ["system", "user", "assistant"]},
                                "content": {"type": "string"}
                            },
                            "required": ["role", "content"]
                        }
                    }
                },
                "required": ["messages"]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use serde_json::Map;

    use crate::providers::base::{LLMResponse, ToolCallRequest};

    /// Mock provider that answers through the call-back tool.
    struct StructuredProvider {
        reply_messages: Value,
    }

    #[async_trait]
    impl LLMProvider for StructuredProvider {
        async fn chat(
            &self,
            _messages: &[Value],
            tools: Option<&[Value]>,
            tool_choice: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
        ) -> anyhow::Result<LLMResponse> {
            // The compactor must demand the structured call-back.
            assert_eq!(tool_choice, Some("required"));
            let defs = tools.unwrap();
            assert_eq!(defs[0]["function"]["name"], "return_compacted_history");

            let mut args = Map::new();
            args.insert("messages".to_string(), self.reply_messages.clone());
            Ok(LLMResponse {
                content: None,
                tool_calls: vec![ToolCallRequest {
                    id: "call_compact".to_string(),
                    name: "return_compacted_history".to_string(),
                    arguments: ToolArguments::Parsed(args),
                }],
                finish_reason: "tool_calls".to_string(),
                usage: HashMap::new(),
            })
        }

        fn get_default_model(&self) -> &str {
            "mock"
        }
    }

    /// Mock provider that fails with a transport error.
    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        async fn chat(
            &self,
            _messages: &[Value],
            _tools: Option<&[Value]>,
            _tool_choice: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
        ) -> anyhow::Result<LLMResponse> {
            Err(anyhow::anyhow!("LLM unavailable"))
        }

        fn get_default_model(&self) -> &str {
            "mock"
        }
    }

    /// Mock provider that answers in free text instead of the tool.
    struct FreeTextProvider;

    #[async_trait]
    impl LLMProvider for FreeTextProvider {
        async fn chat(
            &self,
            _messages: &[Value],
            _tools: Option<&[Value]>,
            _tool_choice: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
        ) -> anyhow::Result<LLMResponse> {
            Ok(LLMResponse {
                content: Some("here is a summary".to_string()),
                tool_calls: vec![],
                finish_reason: "stop".to_string(),
                usage: HashMap::new(),
            })
        }

        fn get_default_model(&self) -> &str {
            "mock"
        }
    }

    fn sample_history() -> Vec<Value> {
        vec![
            json!({"role": "system", "content": "You are a focused software engineer."}),
            json!({"role": "user", "content": "Build a todo app in app.py"}),
            json!({"role": "assistant", "content": "Writing app.py now."}),
            json!({"role": "tool", "tool_call_id": "call_1", "name": "write_file",
                   "content": "{\"ok\":true}"}),
            json!({"role": "assistant", "content": "Done. Anything else?"}),
        ]
    }

    #[tokio::test]
    async fn successful_compaction_keeps_tail_identical() {
        let provider = Arc::new(StructuredProvider {
            reply_messages: json!([
                {"role": "system", "content": "Goal: todo app in app.py. File written."}
            ]),
        });
        let compactor = HistoryCompactor::new(provider);
        let history = sample_history();

        let outcome = compactor.compact(&history, 2).await;
        assert_eq!(outcome.status, CompactionStatus::Success);
        // head' (1 message) + tail (2 messages)
        assert_eq!(outcome.messages.len(), 3);
        assert_eq!(
            outcome.messages[0]["content"],
            "Goal: todo app in app.py. File written."
        );
        // The tail is byte-identical to the last two originals.
        assert_eq!(outcome.messages[1], history[3]);
        assert_eq!(outcome.messages[2], history[4]);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_crude_fallback() {
        let compactor = HistoryCompactor::new(Arc::new(FailingProvider));
        let history = sample_history();

        let outcome = compactor.compact(&history, 1).await;
        assert_eq!(outcome.status, CompactionStatus::Error);
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0]["role"], "system");
        assert!(outcome.messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("Condensed earlier context"));
        assert_eq!(outcome.messages[1], history[4]);
    }

    #[tokio::test]
    async fn free_text_reply_is_a_failure() {
        let compactor = HistoryCompactor::new(Arc::new(FreeTextProvider));
        let history = sample_history();

        let outcome = compactor.compact(&history, 1).await;
        assert_eq!(outcome.status, CompactionStatus::Error);
        // Still usable: crude summary + tail.
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[1], history[4]);
    }

    #[tokio::test]
    async fn empty_reply_messages_is_a_failure() {
        let provider = Arc::new(StructuredProvider {
            reply_messages: json!([]),
        });
        let compactor = HistoryCompactor::new(provider);
        let history = sample_history();

        let outcome = compactor.compact(&history, 1).await;
        assert_eq!(outcome.status, CompactionStatus::Error);
        assert_eq!(outcome.messages[1], history[4]);
    }

    #[tokio::test]
    async fn invalid_roles_are_dropped_from_reply() {
        let provider = Arc::new(StructuredProvider {
            reply_messages: json!([
                {"role": "tool", "content": "raw tool junk"},
                {"role": "assistant", "content": "kept"}
            ]),
        });
        let compactor = HistoryCompactor::new(provider);
        let history = sample_history();

        let outcome = compactor.compact(&history, 1).await;
        assert_eq!(outcome.status, CompactionStatus::Success);
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0]["content"], "kept");
    }

    #[tokio::test]
    async fn keep_all_messages_is_a_noop() {
        let compactor = HistoryCompactor::new(Arc::new(FailingProvider));
        let history = sample_history();

        // keep_last_n >= len: no head, no call, unchanged messages.
        let outcome = compactor.compact(&history, 10).await;
        assert_eq!(outcome.status, CompactionStatus::Success);
        assert_eq!(outcome.messages, history);
    }
}
