//! End-to-end task runs against a scripted provider and a real workspace.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use forgebot::agent::tools::filesystem::{
    DescribeWorkspaceTool, ListFilesTool, ReadFileTool, WriteFileTool,
};
use forgebot::agent::tools::shell::RunShellTool;
use forgebot::agent::tools::ToolRegistry;
use forgebot::agent::{ConversationController, LoopState, Session, Workspace};
use forgebot::config::schema::Config;
use forgebot::providers::base::{
    LLMProvider, LLMResponse, ToolArguments, ToolCallRequest,
};

/// Provider replaying a fixed sequence of responses.
struct ScriptedProvider {
    script: Mutex<VecDeque<LLMResponse>>,
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        _messages: &[Value],
        _tools: Option<&[Value]>,
        _tool_choice: Option<&str>,
        _max_tokens: u32,
        _temperature: f64,
    ) -> anyhow::Result<LLMResponse> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("script ran out of responses"))
    }

    fn get_default_model(&self) -> &str {
        "scripted"
    }
}

fn tool_call(id: &str, name: &str, args: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: ToolArguments::Raw(args.to_string()),
    }
}

fn calls_reply(calls: Vec<ToolCallRequest>) -> LLMResponse {
    LLMResponse {
        content: None,
        tool_calls: calls,
        finish_reason: "tool_calls".to_string(),
        usage: HashMap::new(),
    }
}

fn text_reply(text: &str) -> LLMResponse {
    LLMResponse {
        content: Some(text.to_string()),
        tool_calls: vec![],
        finish_reason: "stop".to_string(),
        usage: HashMap::new(),
    }
}

fn fixture(
    script: Vec<LLMResponse>,
) -> (ConversationController, Session, Arc<Workspace>, TempDir) {
    let dir = TempDir::new().unwrap();
    let workspace = Arc::new(Workspace::new(dir.path().join("ws")).unwrap());

    let config = Config::default();
    let mut registry = ToolRegistry::new();
    registry
        .register(Box::new(WriteFileTool::new(workspace.clone())))
        .unwrap();
    registry
        .register(Box::new(ReadFileTool::new(workspace.clone())))
        .unwrap();
    registry
        .register(Box::new(ListFilesTool::new(workspace.clone())))
        .unwrap();
    registry
        .register(Box::new(DescribeWorkspaceTool::new(workspace.clone())))
        .unwrap();
    registry
        .register(Box::new(RunShellTool::new(
            workspace.clone(),
            config.shell_timeout_sec,
        )))
        .unwrap();

    let provider = Arc::new(ScriptedProvider {
        script: Mutex::new(script.into()),
    });
    let controller = ConversationController::new(provider, Arc::new(registry), &config);
    let session = Session::new(workspace.clone());
    (controller, session, workspace, dir)
}

fn tool_messages(session: &Session) -> Vec<Value> {
    session
        .messages
        .iter()
        .filter(|m| m["role"] == "tool")
        .map(|m| serde_json::from_str(m["content"].as_str().unwrap()).unwrap())
        .collect()
}

#[tokio::test]
async fn write_read_finish_round_trip() {
    let (mut controller, mut session, workspace, _dir) = fixture(vec![
        calls_reply(vec![tool_call(
            "call_1",
            "write_file",
            r#"{"path": "app.py", "content": "print('hi')\n"}"#,
        )]),
        calls_reply(vec![tool_call("call_2", "read_file", r#"{"path": "app.py"}"#)]),
        text_reply("Created app.py with a greeting."),
    ]);

    let outcome = controller
        .run_task(&mut session, "Create app.py printing a greeting")
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.text, "Created app.py with a greeting.");
    assert_eq!(outcome.iterations_used, 3);

    // The file really exists under the sandbox root.
    let on_disk = std::fs::read_to_string(workspace.root().join("app.py")).unwrap();
    assert_eq!(on_disk, "print('hi')\n");

    let results = tool_messages(&session);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["ok"], true);
    assert_eq!(results[0]["data"]["path"], "app.py");
    assert_eq!(results[1]["data"]["content"], "print('hi')\n");
}

#[tokio::test]
async fn shell_and_listing_work_through_the_loop() {
    let (mut controller, mut session, _workspace, _dir) = fixture(vec![
        calls_reply(vec![tool_call(
            "call_1",
            "run_shell",
            r#"{"command": "echo one > a.txt; echo two > b.txt"}"#,
        )]),
        calls_reply(vec![
            tool_call("call_2", "list_files", r#"{"pattern": "*.txt"}"#),
            tool_call("call_3", "describe_workspace", "{}"),
        ]),
        text_reply("Two files created."),
    ]);

    let outcome = controller.run_task(&mut session, "make two files").await.unwrap();
    assert_eq!(outcome.state, LoopState::Done);

    let results = tool_messages(&session);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["data"]["exit_code"], 0);
    assert_eq!(results[1]["data"]["count"], 2);
    assert_eq!(results[1]["data"]["files"][0]["path"], "a.txt");
    let tree = results[2]["data"]["tree"].as_str().unwrap();
    assert!(tree.contains("a.txt") && tree.contains("b.txt"));
}

#[tokio::test]
async fn sandbox_violation_comes_back_as_tool_error() {
    let (mut controller, mut session, workspace, _dir) = fixture(vec![
        calls_reply(vec![tool_call(
            "call_1",
            "write_file",
            r#"{"path": "../outside.txt", "content": "nope"}"#,
        )]),
        text_reply("That path is not allowed."),
    ]);

    let outcome = controller.run_task(&mut session, "escape").await.unwrap();
    assert_eq!(outcome.state, LoopState::Done);

    let results = tool_messages(&session);
    assert_eq!(results[0]["ok"], false);
    assert_eq!(results[0]["error"]["type"], "PathEscapeError");
    assert!(!workspace.root().parent().unwrap().join("outside.txt").exists());
}

#[tokio::test]
async fn overwrite_guard_round_trips_through_the_loop() {
    let (mut controller, mut session, _workspace, _dir) = fixture(vec![
        calls_reply(vec![tool_call(
            "call_1",
            "write_file",
            r#"{"path": "f.txt", "content": "one"}"#,
        )]),
        calls_reply(vec![tool_call(
            "call_2",
            "write_file",
            r#"{"path": "f.txt", "content": "two", "overwrite": false}"#,
        )]),
        text_reply("done"),
    ]);

    controller.run_task(&mut session, "task").await.unwrap();
    let results = tool_messages(&session);
    assert_eq!(results[0]["ok"], true);
    assert_eq!(results[1]["ok"], false);
    assert_eq!(results[1]["error"]["type"], "AlreadyExistsError");
}
