//! # kestrel-contracts
//!
//! Shared types, schemas, and error contracts for the kestrel agent runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, constructors and error types.

pub mod call;
pub mod decision;
pub mod error;
pub mod schema;
pub mod turn;
pub mod unit;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use call::{Arguments, ExecutionResult, ExecutionStatus, PendingToolCall, ToolOutput};
    use decision::ToolCallRequest;
    use error::{ErrorKind, KestrelError};
    use schema::{InvocationSchema, ParameterSchema, SemanticType};
    use turn::{Role, Turn};
    use unit::{Stimulus, StimulusOrigin, UnitName};

    fn add_schema() -> InvocationSchema {
        InvocationSchema {
            name: "add".to_string(),
            description: "Add two numbers".to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "a".to_string(),
                    semantic_type: SemanticType::Integer,
                    description: "first".to_string(),
                    required: true,
                },
                ParameterSchema {
                    name: "b".to_string(),
                    semantic_type: SemanticType::Integer,
                    description: "second".to_string(),
                    required: false,
                },
            ],
        }
    }

    // ── Arguments ────────────────────────────────────────────────────────────

    #[test]
    fn arguments_parse_object() {
        let args = Arguments::parse("delete_file", r#"{"path": "x.txt"}"#).unwrap();
        assert_eq!(args.require_str("delete_file", "path").unwrap(), "x.txt");
    }

    #[test]
    fn arguments_parse_blank_is_empty() {
        let args = Arguments::parse("restart", "   ").unwrap();
        assert_eq!(args.keys().count(), 0);
    }

    #[test]
    fn arguments_parse_rejects_non_object() {
        let err = Arguments::parse("add", "[1, 2]").unwrap_err();
        assert!(matches!(err, KestrelError::InvalidArguments { .. }));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn arguments_parse_rejects_malformed_json() {
        let err = Arguments::parse("add", "{a: 1").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn arguments_bool_or_defaults_and_type_checks() {
        let args = Arguments::parse("run_command", r#"{"background": "yes"}"#).unwrap();
        assert!(args.bool_or("run_command", "missing", true).unwrap());
        assert!(args.bool_or("run_command", "background", false).is_err());
    }

    #[test]
    fn pending_call_keeps_parse_failure_as_data() {
        let request = ToolCallRequest::new("call-1", "add", "not json");
        let pending = PendingToolCall::from_request(&request, 3);
        assert_eq!(pending.origin_turn, 3);
        assert!(pending.arguments.is_err());
    }

    // ── ExecutionResult ──────────────────────────────────────────────────────

    #[test]
    fn execution_status_serializes_kebab_case() {
        let json = serde_json::to_string(&ExecutionStatus::ToolNotFound).unwrap();
        assert_eq!(json, "\"tool-not-found\"");
    }

    #[test]
    fn denied_output_maps_to_denied_status() {
        let result = ExecutionResult::from(ToolOutput::Denied("denied: no".to_string()));
        assert_eq!(result.status, ExecutionStatus::Denied);
        assert_eq!(result.render(), "denied: no");
    }

    #[test]
    fn structured_output_renders_as_json() {
        let result = ExecutionResult::from(ToolOutput::Structured(json!({ "sum": 3 })));
        assert!(result.is_ok());
        assert_eq!(result.render(), r#"{"sum":3}"#);
    }

    // ── InvocationSchema ─────────────────────────────────────────────────────

    #[test]
    fn schema_required_lists_only_required() {
        assert_eq!(add_schema().required(), vec!["a"]);
    }

    #[test]
    fn function_json_has_openai_shape() {
        let v = add_schema().to_function_json();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "add");
        assert_eq!(v["function"]["parameters"]["properties"]["a"]["type"], "integer");
        assert_eq!(v["function"]["parameters"]["required"], json!(["a"]));
    }

    // ── Turn ─────────────────────────────────────────────────────────────────

    #[test]
    fn turn_serializes_with_role_tag() {
        let v = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(v, json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn tool_turn_text_is_rendered_result() {
        let turn = Turn::Tool {
            call_id: "c1".to_string(),
            tool_name: "read_file".to_string(),
            result: ExecutionResult::tool_error("boom"),
        };
        assert_eq!(turn.role(), Role::Tool);
        assert_eq!(turn.text(), "boom");
    }

    // ── Identity ─────────────────────────────────────────────────────────────

    #[test]
    fn unit_names_are_unique() {
        let names: std::collections::HashSet<String> =
            (0..100).map(|_| UnitName::generate().0).collect();
        assert_eq!(names.len(), 100);
        assert!(names.iter().all(|n| n.starts_with(UnitName::PREFIX) && n.len() == 37));
    }

    #[test]
    fn whitespace_stimulus_is_blank() {
        assert!(Stimulus::new(" \n\t", StimulusOrigin::Interactive).is_blank());
        assert!(!Stimulus::new("go", StimulusOrigin::Interactive).is_blank());
    }

    // ── KestrelError ─────────────────────────────────────────────────────────

    #[test]
    fn error_kinds_follow_taxonomy() {
        let load = KestrelError::UnitLoad {
            path: "tools/x.toml".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(load.kind(), ErrorKind::LoadFailure);
        assert!(load.to_string().contains("tools/x.toml"));

        let decision = KestrelError::DecisionRequest { reason: "timeout".to_string() };
        assert_eq!(decision.kind(), ErrorKind::DecisionRequestFailure);

        assert_eq!(KestrelError::tool_failed("t", "r").kind(), ErrorKind::ToolError);
        assert_eq!(KestrelError::invalid_arguments("t", "r").kind(), ErrorKind::ToolError);
    }

    #[test]
    fn error_config_display() {
        let err = KestrelError::ConfigError { reason: "missing model".to_string() };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("missing model"));
    }
}
