//! The graph runner: spawns ready nodes, merges their state updates in
//! completion order, and routes to successors until every scheduled branch
//! has drained. The `JoinSet` doubles as the terminal join barrier, so the
//! branch count never needs to be known up front.

use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::models::Mode;

use super::nodes::{NodeOutput, run_node};
use super::state::ConversationState;
use super::{NodeId, NodePayload, RawEvent, TurnContext};

pub struct OrchestrationGraph {
    ctx: TurnContext,
}

impl OrchestrationGraph {
    pub fn new(ctx: TurnContext) -> Self {
        Self { ctx }
    }

    /// Drives one turn from the entry node to the join barrier and returns
    /// the final conversation state.
    #[instrument(skip_all, fields(mode = ?state.mode(), topic = ?state.topic()))]
    pub async fn run_turn(&self, mut state: ConversationState) -> ConversationState {
        let mut tasks: JoinSet<(NodeId, NodeOutput)> = JoinSet::new();
        self.spawn_node(&mut tasks, NodeId::InitialResponse, &state);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((node, output)) => {
                    let failed = matches!(output.payload, NodePayload::Failed { .. });
                    state.apply(output.update);
                    self.ctx.emit(RawEvent::NodeCompleted {
                        node,
                        payload: output.payload,
                    });
                    if failed {
                        debug!(%node, "Branch ended at failed node");
                        continue;
                    }
                    for next in successors(node, &state) {
                        self.spawn_node(&mut tasks, next, &state);
                    }
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    error!(error = %err, "Node task panicked");
                }
            }
        }

        info!(messages = state.messages.len(), "Turn complete");
        state
    }

    fn spawn_node(
        &self,
        tasks: &mut JoinSet<(NodeId, NodeOutput)>,
        node: NodeId,
        state: &ConversationState,
    ) {
        self.ctx.emit(RawEvent::NodeStarted { node });
        let ctx = self.ctx.clone();
        let snapshot = state.clone();
        tasks.spawn(async move {
            let output = run_node(node, &ctx, &snapshot).await;
            (node, output)
        });
    }
}

/// The edge table. Successors are computed against the state as merged after
/// the node completed, so routing sees the node's own contribution.
fn successors(node: NodeId, state: &ConversationState) -> Vec<NodeId> {
    match node {
        NodeId::InitialResponse => {
            // The followup branch runs concurrently with whichever main
            // branch gets scheduled; first match wins on the main branch.
            let mut next = vec![NodeId::FollowupGeneration];
            if !state.pending_tool_calls().is_empty() {
                next.push(NodeId::ToolDispatch);
            } else if state.mode() == Mode::Timeline {
                next.push(NodeId::TimelineGeneration);
            } else {
                next.push(NodeId::FinalResponse);
            }
            next
        }
        NodeId::ToolDispatch => match state.mode() {
            Mode::Timeline => vec![NodeId::TimelineGeneration],
            Mode::Informative => vec![NodeId::FinalResponse],
        },
        NodeId::FollowupGeneration | NodeId::TimelineGeneration | NodeId::FinalResponse => {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ToolCallRecord, Topic, TurnMessage};

    fn state_with(mode: Mode, tool_calls: Vec<ToolCallRecord>) -> ConversationState {
        let mut state = ConversationState::new(Vec::new(), "hello", Topic::General, mode);
        let mut update = super::super::state::StateUpdate::default();
        update
            .messages
            .push(TurnMessage::assistant("", tool_calls));
        state.apply(update);
        state
    }

    fn call(name: &str) -> ToolCallRecord {
        ToolCallRecord {
            call_id: "c1".to_string(),
            name: name.to_string(),
            arguments: serde_json::json!({}),
        }
    }

    #[test]
    fn tool_calls_route_to_dispatch_alongside_followups() {
        let state = state_with(Mode::Informative, vec![call("web_search")]);
        let next = successors(NodeId::InitialResponse, &state);
        assert_eq!(
            next,
            vec![NodeId::FollowupGeneration, NodeId::ToolDispatch]
        );
    }

    #[test]
    fn timeline_mode_without_tool_calls_routes_to_timeline() {
        let state = state_with(Mode::Timeline, Vec::new());
        let next = successors(NodeId::InitialResponse, &state);
        assert_eq!(
            next,
            vec![NodeId::FollowupGeneration, NodeId::TimelineGeneration]
        );
    }

    #[test]
    fn informative_mode_without_tool_calls_routes_to_final_response() {
        let state = state_with(Mode::Informative, Vec::new());
        let next = successors(NodeId::InitialResponse, &state);
        assert_eq!(
            next,
            vec![NodeId::FollowupGeneration, NodeId::FinalResponse]
        );
    }

    #[test]
    fn dispatch_routes_by_mode() {
        let timeline = state_with(Mode::Timeline, Vec::new());
        assert_eq!(
            successors(NodeId::ToolDispatch, &timeline),
            vec![NodeId::TimelineGeneration]
        );
        let informative = state_with(Mode::Informative, Vec::new());
        assert_eq!(
            successors(NodeId::ToolDispatch, &informative),
            vec![NodeId::FinalResponse]
        );
    }

    #[test]
    fn leaf_nodes_have_no_successors() {
        let state = state_with(Mode::Informative, Vec::new());
        for node in [
            NodeId::FollowupGeneration,
            NodeId::TimelineGeneration,
            NodeId::FinalResponse,
        ] {
            assert!(successors(node, &state).is_empty());
        }
    }
}
