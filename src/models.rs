// src/models.rs
//
// Domain types threaded through one conversation turn.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Topic classification for a turn. Set once at turn start, read-only after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    General,
    News,
    Finance,
}

/// Conversation mode for a turn. Set once at turn start, read-only after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Informative,
    Timeline,
}

/// One inbound request: a single user-message request/response cycle through
/// the orchestration graph.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub topic: Topic,
    pub mode: Mode,
    pub checkpoint_id: Option<String>,
}

/// A tool call produced by the model. `name` stays a raw string here because
/// the model may emit names we do not recognize; parsing into the closed
/// [`crate::tools::ToolName`] set happens at dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub name: String,
    pub arguments: JsonValue,
}

/// The result of one tool call, correlated to the call by `call_id`.
/// Invocation failures are encoded here as an `{"error": ...}` content body
/// rather than raised, so the model can see and adapt to them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutcome {
    pub name: String,
    pub call_id: String,
    pub content: JsonValue,
}

/// A role-tagged entry of the conversation history. Append-only for the
/// duration of a turn; entries are never reordered or removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum TurnMessage {
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default)]
        tool_calls: Vec<ToolCallRecord>,
    },
    ToolResult(ToolOutcome),
}

impl TurnMessage {
    pub fn user(content: impl Into<String>) -> Self {
        TurnMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        TurnMessage::Assistant {
            content: content.into(),
            tool_calls,
        }
    }
}
