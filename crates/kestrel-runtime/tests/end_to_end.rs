//! End-to-end cycles through the real registry, built-in tools and loop,
//! with a scripted completion service standing in for the HTTP client.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::json;

use kestrel_contracts::{
    call::ExecutionStatus,
    decision::{Decision, ToolCallRequest},
    error::{KestrelError, KestrelResult},
    schema::{InvocationSchema, SemanticType},
    turn::Turn,
};
use kestrel_core::{
    gate::{Approver, DenyAll, ScriptedApprover},
    traits::CompletionService,
    CycleOutcome, Orchestrator,
};
use kestrel_runtime::{build_orchestrator, AgentConfig};

// ── Scripted completion service ──────────────────────────────────────────────

#[derive(Clone, Default)]
struct ScriptedService {
    replies: Arc<Mutex<VecDeque<KestrelResult<Decision>>>>,
    requests: Arc<Mutex<Vec<Vec<InvocationSchema>>>>,
}

impl ScriptedService {
    fn new(replies: Vec<KestrelResult<Decision>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Tool schemas attached to each request, in request order.
    fn requests(&self) -> Vec<Vec<InvocationSchema>> {
        self.requests.lock().unwrap().clone()
    }

    fn tool_names(&self, request: usize) -> Vec<String> {
        self.requests()[request].iter().map(|s| s.name.clone()).collect()
    }
}

impl CompletionService for ScriptedService {
    fn complete(&self, _turns: &[Turn], tools: &[InvocationSchema]) -> KestrelResult<Decision> {
        self.requests.lock().unwrap().push(tools.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Decision::answer("done")))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

const ADD_UNIT: &str = r#"
[[tool]]
name = "add"
doc = """
Add two numbers
:param a: first
:param b: second
"""
returns = "int"

[[tool.param]]
name = "a"
type = "int"

[[tool.param]]
name = "b"
type = "int"
default = 0

[tool.run]
command = "sh"
args = ["-c", "echo \"$KESTREL_INPUT\""]
"#;

const FAILING_UNIT: &str = r#"
[[tool]]
name = "flaky"
doc = "Always fails"

[tool.run]
command = "sh"
args = ["-c", "echo boom >&2; exit 3"]
"#;

const SYSTEM_TOOLS: [&str; 8] = [
    "file_exists",
    "read_file",
    "write_file",
    "delete_file",
    "read_directory",
    "create_directory",
    "run_command",
    "restart",
];

fn config_for(tools_dir: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.registry.tools_dir = Some(tools_dir.to_path_buf());
    config
}

fn agent(tools_dir: &Path, service: &ScriptedService, approver: Arc<dyn Approver>) -> Orchestrator {
    build_orchestrator(&config_for(tools_dir), Box::new(service.clone()), approver).unwrap()
}

fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, name, args.to_string())
}

fn tool_turns(orchestrator: &Orchestrator) -> Vec<&Turn> {
    orchestrator
        .conversation()
        .turns()
        .iter()
        .filter(|t| matches!(t, Turn::Tool { .. }))
        .collect()
}

fn status_of(turn: &Turn) -> ExecutionStatus {
    match turn {
        Turn::Tool { result, .. } => result.status,
        other => panic!("not a tool turn: {other:?}"),
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn unit_in_tools_dir_is_offered_and_callable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("math.toml"), ADD_UNIT).unwrap();
    let service = ScriptedService::new(vec![Ok(Decision::calls(vec![call("c1", "add", json!({ "a": 2 }))]))]);
    let mut orchestrator = agent(dir.path(), &service, Arc::new(DenyAll));

    let outcome = orchestrator.run_cycle(Some("add 2 and nothing"));
    assert_eq!(outcome, CycleOutcome::Answered);

    let schemas = &service.requests()[0];
    let add = schemas.iter().find(|s| s.name == "add").unwrap();
    assert_eq!(add.description, "Add two numbers");
    assert_eq!(add.required(), vec!["a"]);
    assert_eq!(add.parameters.len(), 2);
    let b = add.parameter("b").unwrap();
    assert_eq!(b.semantic_type, SemanticType::Integer);
    assert_eq!(b.description, "second");
    assert!(!b.required);

    let tools = tool_turns(&orchestrator);
    assert_eq!(tools.len(), 1);
    match tools[0] {
        Turn::Tool { call_id, result, .. } => {
            assert_eq!(call_id, "c1");
            assert_eq!(result.status, ExecutionStatus::Ok);
            assert_eq!(result.value, json!({ "a": 2, "b": 0 }));
        }
        _ => unreachable!(),
    }
}

#[test]
fn denied_delete_leaves_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("x.txt");
    fs::write(&victim, "keep").unwrap();
    let approver = ScriptedApprover::new(["n"]);
    let service = ScriptedService::new(vec![Ok(Decision::calls(vec![call(
        "c1",
        "delete_file",
        json!({ "path": victim.display().to_string() }),
    )]))]);
    let mut orchestrator = agent(&dir.path().join("tools"), &service, Arc::new(approver.clone()));

    orchestrator.run_cycle(Some("delete x.txt"));

    assert!(victim.exists());
    assert_eq!(approver.prompts(), vec![format!("delete file {}", victim.display())]);

    let tools = tool_turns(&orchestrator);
    assert_eq!(status_of(tools[0]), ExecutionStatus::Denied);
    assert!(tools[0].text().contains("denied"));
    // A denial is not a failure: the next request still sees the full set.
    assert_eq!(service.requests().len(), 2);
    assert_eq!(service.tool_names(1), service.tool_names(0));
}

#[test]
fn mistyped_argument_keeps_the_tool_for_a_retry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("math.toml"), ADD_UNIT).unwrap();
    let service = ScriptedService::new(vec![Ok(Decision::calls(vec![call(
        "c1",
        "add",
        json!({ "a": "two" }),
    )]))]);
    let mut orchestrator = agent(dir.path(), &service, Arc::new(DenyAll));

    orchestrator.run_cycle(Some("add two"));

    let tools = tool_turns(&orchestrator);
    assert_eq!(status_of(tools[0]), ExecutionStatus::ToolError);
    assert!(service.tool_names(0).contains(&"add".to_string()));
    assert!(service.tool_names(1).contains(&"add".to_string()));
}

#[test]
fn decision_failure_falls_back_to_baseline_tools() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("math.toml"), ADD_UNIT).unwrap();
    let service = ScriptedService::new(vec![Err(KestrelError::DecisionRequest {
        reason: "connection reset".to_string(),
    })]);
    let mut orchestrator = agent(dir.path(), &service, Arc::new(DenyAll));

    let outcome = orchestrator.run_cycle(Some("hello"));

    assert_eq!(outcome, CycleOutcome::Answered);
    assert!(service.tool_names(0).contains(&"add".to_string()));
    assert_eq!(service.tool_names(1), SYSTEM_TOOLS);

    let errors: Vec<String> = orchestrator
        .conversation()
        .turns()
        .iter()
        .filter(|t| matches!(t, Turn::Error { .. }))
        .map(Turn::text)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("connection reset"));

    // The next cycle refreshes the full set again.
    orchestrator.run_cycle(Some("again"));
    assert!(service.tool_names(2).contains(&"add".to_string()));
}

#[test]
fn broken_unit_degrades_to_baseline_until_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("math.toml"), ADD_UNIT).unwrap();
    fs::write(dir.path().join("zz_broken.toml"), "[[tool]\nname = ").unwrap();
    let service = ScriptedService::new(vec![]);
    let mut orchestrator = agent(dir.path(), &service, Arc::new(DenyAll));

    assert_eq!(orchestrator.run_cycle(Some("hi")), CycleOutcome::Answered);

    assert_eq!(service.requests().len(), 1);
    assert_eq!(service.tool_names(0), SYSTEM_TOOLS);
    let last_error = orchestrator
        .conversation()
        .turns()
        .iter()
        .rev()
        .find(|t| matches!(t, Turn::Error { .. }))
        .unwrap();
    assert!(last_error.text().contains("zz_broken.toml"));
}

#[cfg(unix)]
#[test]
fn failing_tool_is_reported_and_degrades_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("flaky.toml"), FAILING_UNIT).unwrap();
    let service = ScriptedService::new(vec![Ok(Decision::calls(vec![call("c1", "flaky", json!({}))]))]);
    let mut orchestrator = agent(dir.path(), &service, Arc::new(DenyAll));

    orchestrator.run_cycle(Some("try it"));

    let tools = tool_turns(&orchestrator);
    assert_eq!(status_of(tools[0]), ExecutionStatus::ToolError);
    let text = tools[0].text();
    assert!(text.contains("boom"), "{text}");
    assert!(text.contains("exit: 3"), "{text}");

    assert!(service.tool_names(0).contains(&"flaky".to_string()));
    assert_eq!(service.tool_names(1), SYSTEM_TOOLS);
    assert!(!orchestrator
        .conversation()
        .turns()
        .iter()
        .any(|t| matches!(t, Turn::Error { .. })));
}

#[test]
fn unknown_tool_and_bad_arguments_are_reported_as_data() {
    let dir = tempfile::tempdir().unwrap();
    let service = ScriptedService::new(vec![Ok(Decision::calls(vec![
        call("c1", "no_such_tool", json!({})),
        call("c2", "read_file", json!({ "path": "a", "mode": "rb" })),
    ]))]);
    let mut orchestrator = agent(dir.path(), &service, Arc::new(DenyAll));

    orchestrator.run_cycle(Some("go"));

    let tools = tool_turns(&orchestrator);
    assert_eq!(status_of(tools[0]), ExecutionStatus::ToolNotFound);
    assert_eq!(status_of(tools[1]), ExecutionStatus::ToolError);
    assert!(tools[1].text().contains("unexpected argument 'mode'"));
}
