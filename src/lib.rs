//! forgebot: a tool-calling agent loop over OpenAI-compatible endpoints.
//!
//! A task runs as one conversation: the model is called with the full
//! history and the registered tool schemas, its tool calls are executed
//! inside a sandboxed workspace, and the results are appended until the
//! model answers in plain text or the iteration budget runs out.

pub mod agent;
pub mod config;
pub mod errors;
pub mod providers;
