//! Conversation controller: the request/execute/append loop driving a task.
//!
//! One controller owns one model-facing conversation. Each iteration sends
//! the full history plus tool definitions, then either finishes (plain text
//! answer), executes the requested tool calls in order, or compacts the
//! history when the completion was cut off by the context window.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::compaction::{CompactionStatus, HistoryCompactor};
use super::executor::ToolExecutor;
use super::tools::registry::ToolRegistry;
use super::transcript::TranscriptLogger;
use super::workspace::Workspace;
use crate::config::schema::Config;
use crate::providers::base::LLMProvider;

/// Final text when the budget runs out with no assistant text to show.
const EXHAUSTED_SENTINEL: &str = "Max iterations reached without a final answer.";

/// System prompt seeded at the start of every task conversation.
const SYSTEM_PROMPT: &str = "\
You are a focused software agent working inside a sandboxed workspace \
directory. Use the provided tools to read, write, and list files and to run \
shell commands; all paths are relative to the workspace root. Work step by \
step, verify your changes, and when the task is complete reply with a short \
plain-text summary instead of calling more tools.";

/// Phase of the conversation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on the model or executing tool calls.
    Running,
    /// Shrinking history after a truncated completion.
    Compacting,
    /// The model answered with plain text.
    Done,
    /// The iteration budget ran out first.
    Exhausted,
}

/// Terminal result of a run. `state` is always `Done` or `Exhausted`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: LoopState,
    pub text: String,
    pub iterations_used: u32,
}

/// Mutable per-task conversation state. Never shared across tasks.
pub struct Session {
    pub messages: Vec<Value>,
    pub iterations_used: u32,
    pub workspace: Arc<Workspace>,
}

impl Session {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            messages: Vec::new(),
            iterations_used: 0,
            workspace,
        }
    }

    /// Seed the conversation with the system prompt and the task text.
    pub fn seed(&mut self, task: &str) {
        self.messages
            .push(json!({"role": "system", "content": SYSTEM_PROMPT}));
        self.messages.push(json!({"role": "user", "content": task}));
    }
}

/// Drives a session to completion against the model and the tool registry.
pub struct ConversationController {
    provider: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    compactor: HistoryCompactor,
    transcript: TranscriptLogger,
    max_iterations: u32,
    max_tokens: u32,
    temperature: f64,
    keep_last_n: usize,
}

impl ConversationController {
    pub fn new(provider: Arc<dyn LLMProvider>, registry: Arc<ToolRegistry>, config: &Config) -> Self {
        Self {
            executor: ToolExecutor::new(registry.clone()),
            compactor: HistoryCompactor::new(provider.clone()),
            transcript: TranscriptLogger::new(config.log_dir.clone()),
            provider,
            registry,
            max_iterations: config.max_iterations,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            keep_last_n: config.keep_last_n,
        }
    }

    /// Seed a fresh conversation for `task` and run it.
    pub async fn run_task(&mut self, session: &mut Session, task: &str) -> anyhow::Result<RunOutcome> {
        session.seed(task);
        self.run(session).await
    }

    /// Run the loop until the model answers, the budget runs out, or the
    /// provider fails. Transport errors are fatal and propagate.
    pub async fn run(&mut self, session: &mut Session) -> anyhow::Result<RunOutcome> {
        let definitions = self.registry.definitions();
        let mut state = LoopState::Running;
        // Best assistant text so far, shown if the budget runs out.
        let mut last_text = String::new();

        for iteration in 0..self.max_iterations {
            session.iterations_used = iteration + 1;
            debug!(
                iteration = session.iterations_used,
                max = self.max_iterations,
                ?state,
                "loop iteration"
            );
            state = LoopState::Running;

            self.transcript
                .log_request(&session.messages, Some(&definitions));
            let response = self
                .provider
                .chat(
                    &session.messages,
                    Some(&definitions),
                    Some("auto"),
                    self.max_tokens,
                    self.temperature,
                )
                .await?;
            self.transcript.log_response(&json!({
                "content": response.content,
                "finish_reason": response.finish_reason,
                "tool_calls": response.tool_calls.len(),
                "usage": response.usage,
            }));

            // A completion cut off mid-answer with no tool calls is not
            // actionable; shrink the history and let the retry use this
            // iteration's slot. The truncated fragment is discarded.
            if response.is_truncated() && !response.has_tool_calls() {
                state = LoopState::Compacting;
                info!("completion truncated by length limit, compacting history");
                let outcome = self
                    .compactor
                    .compact(&session.messages, self.keep_last_n)
                    .await;
                if outcome.status == CompactionStatus::Error {
                    warn!("compaction degraded to crude summary");
                }
                session.messages = outcome.messages;
                continue;
            }

            let text = response.content.clone().unwrap_or_default();
            let mut assistant = json!({"role": "assistant", "content": text});
            if response.has_tool_calls() {
                assistant["tool_calls"] = Value::Array(
                    response
                        .tool_calls
                        .iter()
                        .map(|c| c.to_openai_json())
                        .collect(),
                );
            }
            session.messages.push(assistant);

            if !response.has_tool_calls() {
                // Plain text answer ends the conversation; empty is a valid
                // answer, distinct from the exhausted sentinel.
                return Ok(RunOutcome {
                    state: LoopState::Done,
                    text,
                    iterations_used: session.iterations_used,
                });
            }
            if !text.trim().is_empty() {
                last_text = text;
            }

            // Strictly in request order; each result goes back under the id
            // the model issued so it can correlate.
            for call in &response.tool_calls {
                let result = self.executor.execute(&call.name, call.arguments.clone()).await;
                debug!(tool = %call.name, ok = result.ok, "tool call finished");
                session.messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "name": call.name,
                    "content": result.to_content(),
                }));
            }
        }

        info!(iterations = session.iterations_used, "iteration budget exhausted");
        let text = if last_text.is_empty() {
            EXHAUSTED_SENTINEL.to_string()
        } else {
            last_text
        };
        Ok(RunOutcome {
            state: LoopState::Exhausted,
            text,
            iterations_used: session.iterations_used,
        })
    }
}
