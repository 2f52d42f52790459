//! Agent tools: the capabilities the model can invoke.

pub mod base;
pub mod filesystem;
pub mod registry;
pub mod shell;

pub use base::Tool;
pub use registry::ToolRegistry;
