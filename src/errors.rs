//! Domain error types for forgebot.
//!
//! Typed errors at module boundaries replace string-encoded errors and
//! enable structured error handling via pattern matching. Provider errors
//! are embedded in `anyhow::Error` so trait signatures stay `anyhow::Result`
//! while callers can downcast: `e.downcast_ref::<ProviderError>()`.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Errors from LLM provider operations.
///
/// These are the only fatal errors in the system: the conversation
/// controller propagates them to its caller instead of recovering.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to read response body: {0}")]
    ResponseReadError(String),

    #[error("Failed to parse response JSON: {0}")]
    JsonParseError(String),

    #[error("LLM API returned status {status}: {message}")]
    ServerError { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Workspace sandbox errors
// ---------------------------------------------------------------------------

/// Errors from workspace sandbox operations.
///
/// Surfaced to the model as tool-result errors carrying the violation type,
/// never propagated past the tool executor.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("path escapes the workspace root: {0}")]
    PathEscape(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file already exists (overwrite disabled): {0}")]
    AlreadyExists(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    /// Stable error-type name exposed to the model in normalized results.
    pub fn error_type(&self) -> &'static str {
        match self {
            WorkspaceError::PathEscape(_) => "PathEscapeError",
            WorkspaceError::NotFound(_) => "NotFoundError",
            WorkspaceError::AlreadyExists(_) => "AlreadyExistsError",
            WorkspaceError::Io { .. } => "IoError",
        }
    }
}

// ---------------------------------------------------------------------------
// Tool errors
// ---------------------------------------------------------------------------

/// Errors a tool implementation may return from `execute`.
///
/// Tools return these explicitly instead of encoding failures in output
/// strings; the executor converts them into normalized tool results.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("command timed out after {0}s")]
    Timeout(u64),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Stable error-type name exposed to the model in normalized results.
    pub fn error_type(&self) -> &'static str {
        match self {
            ToolError::InvalidArgs(_) => "InvalidArgsError",
            ToolError::Workspace(w) => w.error_type(),
            ToolError::Timeout(_) => "TimeoutError",
            ToolError::ExecutionFailed(_) => "ExecutionError",
        }
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Errors from tool registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("tool '{name}' declares an invalid parameter schema: {reason}")]
    InvalidSchema { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let e = ProviderError::HttpError("connection refused".into());
        assert_eq!(e.to_string(), "HTTP request failed: connection refused");
    }

    #[test]
    fn provider_error_downcast_from_anyhow() {
        let anyhow_err: anyhow::Error = ProviderError::ServerError {
            status: 500,
            message: "boom".into(),
        }
        .into();
        let downcasted = anyhow_err.downcast_ref::<ProviderError>();
        assert!(matches!(
            downcasted,
            Some(ProviderError::ServerError { status: 500, .. })
        ));
    }

    #[test]
    fn workspace_error_types() {
        assert_eq!(
            WorkspaceError::PathEscape("../x".into()).error_type(),
            "PathEscapeError"
        );
        assert_eq!(
            WorkspaceError::NotFound("a.txt".into()).error_type(),
            "NotFoundError"
        );
        assert_eq!(
            WorkspaceError::AlreadyExists("a.txt".into()).error_type(),
            "AlreadyExistsError"
        );
    }

    #[test]
    fn tool_error_type_passes_through_workspace_kind() {
        let e = ToolError::from(WorkspaceError::PathEscape("../etc".into()));
        assert_eq!(e.error_type(), "PathEscapeError");
    }

    #[test]
    fn tool_error_timeout_message() {
        let e = ToolError::Timeout(20);
        assert!(e.to_string().contains("20s"));
        assert_eq!(e.error_type(), "TimeoutError");
    }

    #[test]
    fn registry_duplicate_display() {
        let e = RegistryError::DuplicateTool("read_file".into());
        assert!(e.to_string().contains("read_file"));
    }
}
