//! Configuration schema for forgebot.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON
//! config file can use camelCase keys while Rust code uses snake_case fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration, immutable after construction.
///
/// Every component receives the values it needs from here at build time;
/// nothing reads process-wide mutable state mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Messages kept verbatim at the end of history during compaction.
    #[serde(default = "default_keep_last_n")]
    pub keep_last_n: usize,
    #[serde(default = "default_shell_timeout_sec")]
    pub shell_timeout_sec: u64,
    /// Parent directory under which per-task workspaces are created.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    /// Directory for request/response transcripts; `None` disables logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_model() -> String {
    "qwen/qwen3-coder-30b".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_iterations() -> u32 {
    8
}

fn default_keep_last_n() -> usize {
    1
}

fn default_shell_timeout_sec() -> u64 {
    20
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("workspace")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            keep_last_n: default_keep_last_n(),
            shell_timeout_sec: default_shell_timeout_sec(),
            workspace_root: default_workspace_root(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.max_iterations, 8);
        assert_eq!(cfg.keep_last_n, 1);
        assert_eq!(cfg.max_tokens, 2000);
        assert!(cfg.log_dir.is_none());
    }

    #[test]
    fn parses_camel_case_keys() {
        let json = r#"{
            "baseUrl": "http://localhost:8080/v1",
            "maxIterations": 3,
            "keepLastN": 2,
            "shellTimeoutSec": 5
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.base_url, "http://localhost:8080/v1");
        assert_eq!(cfg.max_iterations, 3);
        assert_eq!(cfg.keep_last_n, 2);
        assert_eq!(cfg.shell_timeout_sec, 5);
        // Missing keys fall back to defaults.
        assert_eq!(cfg.temperature, 0.7);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, cfg.model);
        assert_eq!(back.max_iterations, cfg.max_iterations);
    }
}
