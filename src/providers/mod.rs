//! LLM provider implementations.

pub mod base;
pub mod openai_compat;
