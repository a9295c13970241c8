//! Pending tool calls, argument payloads, and execution results.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    decision::ToolCallRequest,
    error::{KestrelError, KestrelResult},
};

/// A structured key → value argument payload for one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse a serialized payload. An empty or whitespace-only payload is an
    /// empty argument set; anything that is not a JSON object is rejected.
    pub fn parse(tool: &str, raw: &str) -> KestrelResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(KestrelError::invalid_arguments(
                tool,
                format!("expected a JSON object, got {}", json_kind(&other)),
            )),
            Err(e) => Err(KestrelError::invalid_arguments(
                tool,
                format!("payload is not valid JSON: {e}"),
            )),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Fetch a required string argument.
    pub fn require_str(&self, tool: &str, key: &str) -> KestrelResult<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(KestrelError::invalid_arguments(
                tool,
                format!("'{key}' must be a string, got {}", json_kind(other)),
            )),
            None => Err(KestrelError::invalid_arguments(
                tool,
                format!("missing required argument '{key}'"),
            )),
        }
    }

    /// Fetch an optional boolean argument, falling back to `default`.
    pub fn bool_or(&self, tool: &str, key: &str, default: bool) -> KestrelResult<bool> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(KestrelError::invalid_arguments(
                tool,
                format!("'{key}' must be a boolean, got {}", json_kind(other)),
            )),
        }
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A tool call ready for dispatch within the current cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub call_id: String,
    pub tool_name: String,
    /// The parsed payload, or the parse failure to report as `tool-error`.
    pub arguments: Result<Arguments, String>,
    /// Index of the assistant Turn that requested this call.
    pub origin_turn: usize,
}

impl PendingToolCall {
    pub fn from_request(request: &ToolCallRequest, origin_turn: usize) -> Self {
        let arguments =
            Arguments::parse(&request.name, &request.arguments).map_err(|e| e.to_string());
        Self {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            arguments,
            origin_turn,
        }
    }
}

/// What a tool body hands back on a normal return.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(Value),
    /// The Confirmation Gate refused; carries the human-readable message.
    Denied(String),
}

/// Outcome classification of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    Ok,
    Denied,
    ToolNotFound,
    ToolError,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Ok => "ok",
            ExecutionStatus::Denied => "denied",
            ExecutionStatus::ToolNotFound => "tool-not-found",
            ExecutionStatus::ToolError => "tool-error",
        };
        f.write_str(s)
    }
}

/// The result of dispatching one call. Always wrapped into a tool Turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// A plain string or a structured payload.
    pub value: Value,
}

impl ExecutionResult {
    pub fn ok(value: Value) -> Self {
        Self { status: ExecutionStatus::Ok, value }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Denied,
            value: Value::String(message.into()),
        }
    }

    pub fn not_found(name: &str) -> Self {
        Self {
            status: ExecutionStatus::ToolNotFound,
            value: Value::String(format!("tool '{name}' not found")),
        }
    }

    pub fn tool_error(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::ToolError,
            value: Value::String(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExecutionStatus::Ok
    }

    /// The text shown to the completion service: strings verbatim,
    /// structured payloads as compact JSON.
    pub fn render(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// What one registry dispatch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub result: ExecutionResult,
    /// Set only when the tool body itself failed or panicked. Lookup misses
    /// and argument rejections leave it clear.
    pub body_failed: bool,
}

impl Dispatched {
    pub fn body_failure(message: impl Into<String>) -> Self {
        Self {
            result: ExecutionResult::tool_error(message),
            body_failed: true,
        }
    }
}

impl From<ExecutionResult> for Dispatched {
    fn from(result: ExecutionResult) -> Self {
        Self { result, body_failed: false }
    }
}

impl From<ToolOutput> for ExecutionResult {
    fn from(output: ToolOutput) -> Self {
        match output {
            ToolOutput::Text(s) => ExecutionResult::ok(Value::String(s)),
            ToolOutput::Structured(v) => ExecutionResult::ok(v),
            ToolOutput::Denied(msg) => ExecutionResult::denied(msg),
        }
    }
}
