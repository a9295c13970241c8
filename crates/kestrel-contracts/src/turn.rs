//! Conversation turns.
//!
//! A Turn is one entry in the append-only conversation history. The variant
//! is the role; each role carries the payload it needs and nothing else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{call::ExecutionResult, decision::ToolCallRequest};

/// Role tag of a Turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Error,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Error => "error",
        };
        f.write_str(s)
    }
}

/// One entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    /// A decision from the completion service. When `tool_calls` is non-empty
    /// this Turn is the origin of those calls and the matching tool Turns
    /// follow it.
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        call_id: String,
        tool_name: String,
        result: ExecutionResult,
    },
    /// A failure reported back into the conversation by RECOVER.
    Error {
        content: String,
    },
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Turn::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Turn::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Turn::Error { content: content.into() }
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::System { .. } => Role::System,
            Turn::User { .. } => Role::User,
            Turn::Assistant { .. } => Role::Assistant,
            Turn::Tool { .. } => Role::Tool,
            Turn::Error { .. } => Role::Error,
        }
    }

    /// Textual view of the payload.
    pub fn text(&self) -> String {
        match self {
            Turn::System { content }
            | Turn::User { content }
            | Turn::Assistant { content, .. }
            | Turn::Error { content } => content.clone(),
            Turn::Tool { result, .. } => result.render(),
        }
    }
}
