//! Request/response transcript logging for model calls.
//!
//! When a log directory is configured, each model call's request and
//! response are written out as numbered JSON files. Logging failures are
//! warned and swallowed; observability never breaks a run.

use std::path::PathBuf;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

/// Writes one JSON file per request and per response.
pub struct TranscriptLogger {
    dir: Option<PathBuf>,
    counter: u32,
}

impl TranscriptLogger {
    /// A logger writing into `dir`, or a no-op logger when `dir` is `None`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir, counter: 0 }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Record one request payload. Advances the call counter.
    pub fn log_request(&mut self, messages: &[Value], tools: Option<&[Value]>) {
        self.counter += 1;
        let payload = json!({
            "messages": messages,
            "tools": tools,
        });
        self.write("request", &payload);
    }

    /// Record the response paired with the most recent request.
    pub fn log_response(&self, payload: &Value) {
        self.write("response", payload);
    }

    fn write(&self, kind: &str, payload: &Value) {
        let Some(dir) = &self.dir else {
            return;
        };
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let path = dir.join(format!("{}_{}_{}.json", kind, self.counter, timestamp));

        let result = std::fs::create_dir_all(dir).and_then(|_| {
            let text = serde_json::to_string_pretty(payload).unwrap_or_default();
            std::fs::write(&path, text)
        });
        if let Err(e) = result {
            warn!("failed to write transcript {}: {}", path.display(), e);
        }
    }
}
