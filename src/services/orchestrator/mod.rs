//! The orchestration graph: a directed-acyclic task graph that takes one
//! conversation turn from user message to terminal join barrier.
//!
//! Node identity, lifecycle kinds, and payloads are all closed variants so
//! the event translator's dispatch is exhaustive and statically checked.

pub mod graph;
pub mod nodes;
pub mod state;
pub mod timeline;

pub use graph::OrchestrationGraph;
pub use state::{AppendLog, ConversationState, SetOnce, StateUpdate};

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::llm::AiClient;
use crate::models::ToolOutcome;
use crate::services::structured_output::TimelineEvent;
use crate::tools::ToolRegistry;

/// Identity of one computation node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    InitialResponse,
    ToolDispatch,
    FollowupGeneration,
    TimelineGeneration,
    FinalResponse,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::InitialResponse => "initial_response",
            NodeId::ToolDispatch => "tool_dispatch",
            NodeId::FollowupGeneration => "followup_generation",
            NodeId::TimelineGeneration => "timeline_generation",
            NodeId::FinalResponse => "final_response",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed payload attached to a node lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Empty,
    /// Assistant content fragments, in emission order.
    Content { fragments: Vec<String> },
    /// One batch of tool results, in call-completion order.
    ToolResults { results: Vec<ToolOutcome> },
    /// The finished timeline.
    Timeline { events: Vec<TimelineEvent> },
    /// The generated follow-up questions.
    Followups { questions: Vec<String> },
    /// A node-boundary failure. The branch ends here; the turn continues.
    Failed { message: String },
}

/// One entry of the raw ordered event stream produced during graph
/// execution. Arrival order is the only ordering signal downstream
/// consumers may rely on.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    NodeStarted {
        node: NodeId,
    },
    NodeStreaming {
        node: NodeId,
        payload: NodePayload,
    },
    NodeCompleted {
        node: NodeId,
        payload: NodePayload,
    },
}

/// Shared read-only collaborators for one turn. Cloned into every spawned
/// node task; holds no per-turn mutable state.
#[derive(Clone)]
pub struct TurnContext {
    pub ai_client: Arc<dyn AiClient>,
    pub registry: Arc<ToolRegistry>,
    pub config: Arc<Config>,
    pub raw_events: mpsc::UnboundedSender<RawEvent>,
}

impl TurnContext {
    /// Best-effort event emission; a closed receiver means the client is
    /// gone and the turn is being torn down anyway.
    pub(crate) fn emit(&self, event: RawEvent) {
        let _ = self.raw_events.send(event);
    }
}

/// Owns the background task driving one turn. Dropping the handle (client
/// disconnect, stream teardown) cancels the turn's outstanding tasks.
pub struct TurnHandle {
    handle: JoinHandle<()>,
}

impl TurnHandle {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }
}

impl Drop for TurnHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
