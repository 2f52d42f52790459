//! Agent core: workspace sandbox, tool execution, and the conversation loop.

pub mod agent_loop;
pub mod compaction;
pub mod executor;
pub mod tools;
pub mod transcript;
pub mod workspace;

pub use agent_loop::{ConversationController, LoopState, RunOutcome, Session};
pub use workspace::Workspace;
