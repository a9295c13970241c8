//! What the completion service returns.

use serde::{Deserialize, Serialize};

/// A tool call requested by the completion service, exactly as received.
///
/// `arguments` is still serialized JSON; it is parsed only when the call is
/// turned into a `PendingToolCall` during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The completion service's response to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Natural-language content. May be empty when only calls are requested.
    pub content: String,
    /// Zero or more requested tool calls, in the order the service listed them.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Decision {
    /// A final answer with no calls.
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A decision that only requests calls.
    pub fn calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }

    pub fn has_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
