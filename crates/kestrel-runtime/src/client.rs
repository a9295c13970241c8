//! OpenAI-compatible chat completions client.
//!
//! The request body and response parsing are pure functions so they can be
//! tested without a server.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use kestrel_contracts::{
    decision::{Decision, ToolCallRequest},
    error::{KestrelError, KestrelResult},
    schema::InvocationSchema,
    turn::Turn,
};
use kestrel_core::traits::CompletionService;

use crate::config::CompletionSection;

/// Prefix marking error Turns, which the API only knows as system messages.
pub const ERROR_PREFIX: &str = "[error] ";

pub struct ChatCompletionsClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(base_url: &str, model: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> KestrelResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KestrelError::ConfigError {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from the `[completion]` section, reading the API key
    /// from the environment.
    pub fn from_config(section: &CompletionSection) -> KestrelResult<Self> {
        Self::new(
            &section.base_url,
            section.model.clone(),
            section.api_key()?,
            Duration::from_secs(section.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionService for ChatCompletionsClient {
    fn complete(&self, turns: &[Turn], tools: &[InvocationSchema]) -> KestrelResult<Decision> {
        let body = build_request_body(&self.model, turns, tools);
        let fail = |reason: String| KestrelError::DecisionRequest { reason };

        debug!(model = %self.model, turns = turns.len(), tools = tools.len(), "sending completion request");

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| fail(format!("POST {} failed: {}", self.endpoint, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "completion API error");
            return Err(fail(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let api_resp: ApiResponse = resp
            .json()
            .map_err(|e| fail(format!("cannot decode response: {}", e)))?;
        parse_response(api_resp)
    }
}

/// Map the conversation and tool schemas onto a chat completions request.
pub fn build_request_body(model: &str, turns: &[Turn], tools: &[InvocationSchema]) -> Value {
    let messages: Vec<Value> = turns.iter().map(turn_message).collect();

    let mut body = json!({
        "model": model,
        "messages": messages,
    });
    if !tools.is_empty() {
        body["tools"] = tools.iter().map(InvocationSchema::to_function_json).collect();
    }
    body
}

fn turn_message(turn: &Turn) -> Value {
    match turn {
        Turn::System { content } => json!({ "role": "system", "content": content }),
        Turn::User { content } => json!({ "role": "user", "content": content }),
        Turn::Assistant { content, tool_calls } if tool_calls.is_empty() => {
            json!({ "role": "assistant", "content": content })
        }
        Turn::Assistant { content, tool_calls } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments },
                    })
                })
                .collect();
            let content = if content.is_empty() { Value::Null } else { Value::String(content.clone()) };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Turn::Tool { call_id, tool_name, result } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "name": tool_name,
            "content": result.render(),
        }),
        Turn::Error { content } => json!({
            "role": "system",
            "content": format!("{ERROR_PREFIX}{content}"),
        }),
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    /// Some local servers omit the id or send null.
    #[serde(default)]
    id: Option<String>,
    function: ApiFunction,
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    name: String,
    /// Usually a JSON string; some servers send the object itself.
    #[serde(default)]
    arguments: Value,
}

/// Turn the first choice into a `Decision`.
pub fn parse_response(resp: ApiResponse) -> KestrelResult<Decision> {
    let choice = resp.choices.into_iter().next().ok_or_else(|| KestrelError::DecisionRequest {
        reason: "response contained no choices".to_string(),
    })?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, c)| {
            let id = c.id.filter(|id| !id.is_empty()).unwrap_or_else(|| format!("call_{index}"));
            let arguments = match c.function.arguments {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            ToolCallRequest::new(id, c.function.name, arguments)
        })
        .collect();

    Ok(Decision {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use kestrel_contracts::{call::ExecutionResult, schema::ParameterSchema, schema::SemanticType};

    use super::*;

    fn parse(v: Value) -> KestrelResult<Decision> {
        parse_response(serde_json::from_value(v).unwrap())
    }

    #[test]
    fn request_body_maps_every_turn_role() {
        let call = ToolCallRequest::new("c1", "read_file", r#"{"path":"a"}"#);
        let turns = vec![
            Turn::system("sys"),
            Turn::user("hi"),
            Turn::Assistant { content: String::new(), tool_calls: vec![call] },
            Turn::Tool {
                call_id: "c1".to_string(),
                tool_name: "read_file".to_string(),
                result: ExecutionResult::ok(json!("contents")),
            },
            Turn::error("decision request failed: timeout"),
            Turn::assistant("done"),
        ];

        let body = build_request_body("m", &turns, &[]);
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(body["model"], "m");
        assert!(body.get("tools").is_none());
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[2]["content"], Value::Null);
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], r#"{"path":"a"}"#);
        assert_eq!(messages[3], json!({
            "role": "tool",
            "tool_call_id": "c1",
            "name": "read_file",
            "content": "contents",
        }));
        assert_eq!(messages[4]["role"], "system");
        assert_eq!(messages[4]["content"], "[error] decision request failed: timeout");
        assert_eq!(messages[5], json!({ "role": "assistant", "content": "done" }));
    }

    #[test]
    fn request_body_attaches_tools() {
        let schema = InvocationSchema {
            name: "add".to_string(),
            description: "Add two numbers".to_string(),
            parameters: vec![ParameterSchema {
                name: "a".to_string(),
                semantic_type: SemanticType::Integer,
                description: "first".to_string(),
                required: true,
            }],
        };

        let body = build_request_body("m", &[Turn::system("s")], &[schema]);

        assert_eq!(body["tools"][0]["function"]["name"], "add");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"], json!(["a"]));
    }

    #[test]
    fn parses_answer() {
        let decision = parse(json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        }))
        .unwrap();
        assert_eq!(decision, Decision::answer("hello"));
    }

    #[test]
    fn parses_tool_calls_with_string_or_object_arguments() {
        let decision = parse(json!({
            "choices": [{ "message": {
                "content": null,
                "tool_calls": [
                    { "id": "c1", "type": "function", "function": { "name": "add", "arguments": "{\"a\":1}" } },
                    { "id": "c2", "type": "function", "function": { "name": "add", "arguments": { "a": 2 } } }
                ]
            }}]
        }))
        .unwrap();

        assert_eq!(decision.content, "");
        assert_eq!(decision.tool_calls[0], ToolCallRequest::new("c1", "add", r#"{"a":1}"#));
        assert_eq!(decision.tool_calls[1].arguments, r#"{"a":2}"#);
    }

    #[test]
    fn missing_tool_call_ids_are_synthesized() {
        let decision = parse(json!({
            "choices": [{ "message": {
                "tool_calls": [
                    { "function": { "name": "read_file", "arguments": "{}" } },
                    { "id": "", "function": { "name": "add", "arguments": "{}" } },
                    { "id": null, "function": { "name": "add", "arguments": "{}" } },
                    { "id": "kept", "function": { "name": "add", "arguments": "{}" } }
                ]
            }}]
        }))
        .unwrap();

        let ids: Vec<&str> = decision.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["call_0", "call_1", "call_2", "kept"]);
    }

    #[test]
    fn empty_choices_is_decision_failure() {
        let err = parse(json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, KestrelError::DecisionRequest { .. }));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = ChatCompletionsClient::new("http://localhost:1234/v1/", "m", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
