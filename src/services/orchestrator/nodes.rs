//! Node implementations for the orchestration graph.
//!
//! Each node receives a snapshot of the conversation state and returns a
//! [`NodeOutput`]: a [`StateUpdate`] for the runner to merge and the payload
//! attached to the node's completion event. Errors crossing a node boundary
//! become a `Failed` payload; the rest of the turn keeps going.

use std::sync::Arc;

use futures::StreamExt;
use genai::chat::{ChatMessage, ChatRequest, ChatStreamEvent, ToolCall, ToolResponse};
use tracing::{debug, error, instrument, warn};

use crate::errors::AppError;
use crate::llm::structured::StructuredResponder;
use crate::models::{Mode, ToolCallRecord, TurnMessage};
use crate::services::prompt_templates;
use crate::services::structured_output::{FollowupOutput, followup_schema};
use crate::tools::{DispatchContext, ToolName};

use super::state::{ConversationState, StateUpdate};
use super::timeline::TimelineRefinery;
use super::{NodeId, NodePayload, RawEvent, TurnContext};

/// What a node hands back to the graph runner.
pub struct NodeOutput {
    pub update: StateUpdate,
    pub payload: NodePayload,
}

impl NodeOutput {
    fn empty() -> Self {
        Self {
            update: StateUpdate::default(),
            payload: NodePayload::Empty,
        }
    }
}

/// Runs one node against a state snapshot. A node-level error is logged and
/// folded into a `Failed` payload here so the runner never sees a `Result`.
pub async fn run_node(node: NodeId, ctx: &TurnContext, state: &ConversationState) -> NodeOutput {
    let result = match node {
        NodeId::InitialResponse => initial_response(ctx, state).await,
        NodeId::ToolDispatch => tool_dispatch(ctx, state).await,
        NodeId::FollowupGeneration => followup_generation(ctx, state).await,
        NodeId::TimelineGeneration => timeline_generation(ctx, state).await,
        NodeId::FinalResponse => final_response(ctx, state).await,
    };

    match result {
        Ok(output) => output,
        Err(err) => {
            error!(%node, error = %err, "Node failed");
            NodeOutput {
                update: StateUpdate::default(),
                payload: NodePayload::Failed {
                    message: err.to_string(),
                },
            }
        }
    }
}

/// Builds a chat request from the turn's message history.
fn chat_request(state: &ConversationState, system_prompt: String) -> ChatRequest {
    let mut messages = Vec::with_capacity(state.messages.len());
    for entry in state.messages.iter() {
        match entry {
            TurnMessage::User { content } => {
                messages.push(ChatMessage::user(content.clone()));
            }
            TurnMessage::Assistant {
                content,
                tool_calls,
            } => {
                if !content.is_empty() {
                    messages.push(ChatMessage::assistant(content.clone()));
                }
                if !tool_calls.is_empty() {
                    let calls: Vec<ToolCall> = tool_calls
                        .iter()
                        .map(|call| ToolCall {
                            call_id: call.call_id.clone(),
                            fn_name: call.name.clone(),
                            fn_arguments: call.arguments.clone(),
                            thought_signatures: None,
                        })
                        .collect();
                    messages.push(ChatMessage::from(calls));
                }
            }
            TurnMessage::ToolResult(outcome) => {
                messages.push(ChatMessage::from(ToolResponse::new(
                    outcome.call_id.clone(),
                    outcome.content.to_string(),
                )));
            }
        }
    }
    ChatRequest::new(messages).with_system(system_prompt)
}

/// Streams one assistant response, forwarding content fragments to the raw
/// event stream as they arrive and collecting any tool calls the model makes.
async fn stream_assistant_response(
    ctx: &TurnContext,
    node: NodeId,
    request: ChatRequest,
) -> Result<(Vec<String>, Vec<ToolCallRecord>), AppError> {
    let mut stream = ctx
        .ai_client
        .stream_chat(&ctx.config.chat_model, request, None)
        .await?;

    let mut fragments: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCallRecord> = Vec::new();

    while let Some(event) = stream.next().await {
        match event? {
            ChatStreamEvent::Start => {}
            ChatStreamEvent::Chunk(chunk) => {
                if chunk.content.is_empty() {
                    continue;
                }
                ctx.emit(RawEvent::NodeStreaming {
                    node,
                    payload: NodePayload::Content {
                        fragments: vec![chunk.content.clone()],
                    },
                });
                fragments.push(chunk.content);
            }
            ChatStreamEvent::ReasoningChunk(_) => {}
            ChatStreamEvent::ThoughtSignatureChunk(_) => {}
            ChatStreamEvent::ToolCallChunk(chunk) => {
                let call = chunk.tool_call;
                debug!(%node, tool = %call.fn_name, "Model requested tool call");
                tool_calls.push(ToolCallRecord {
                    call_id: call.call_id,
                    name: call.fn_name,
                    arguments: call.fn_arguments,
                });
            }
            ChatStreamEvent::End(_) => break,
        }
    }

    Ok((fragments, tool_calls))
}

/// Entry node: one model invocation over the full history with the turn's
/// mode-selected system prompt and the registry's tool declarations.
#[instrument(skip_all)]
async fn initial_response(
    ctx: &TurnContext,
    state: &ConversationState,
) -> Result<NodeOutput, AppError> {
    let system_prompt = match state.mode() {
        Mode::Timeline => prompt_templates::timeline_acknowledgment_prompt(),
        Mode::Informative => prompt_templates::informative_system_prompt(),
    };
    let request = chat_request(state, system_prompt).with_tools(ctx.registry.tool_specs());

    let (fragments, tool_calls) =
        stream_assistant_response(ctx, NodeId::InitialResponse, request).await?;

    let mut update = StateUpdate::default();
    update.response_started = !fragments.is_empty();
    update
        .messages
        .push(TurnMessage::assistant(fragments.concat(), tool_calls));

    Ok(NodeOutput {
        update,
        payload: NodePayload::Content { fragments },
    })
}

/// Dispatches the tool calls attached to the latest assistant message as one
/// concurrent batch and appends their results to the history.
#[instrument(skip_all, fields(calls = state.pending_tool_calls().len()))]
async fn tool_dispatch(
    ctx: &TurnContext,
    state: &ConversationState,
) -> Result<NodeOutput, AppError> {
    let calls = state.pending_tool_calls().to_vec();
    let context = DispatchContext {
        topic: state.topic(),
        mode: state.mode(),
    };
    let results = ctx.registry.dispatch_batch(&calls, &context).await;

    let mut update = StateUpdate::default();
    update.messages.extend(
        results
            .iter()
            .cloned()
            .map(TurnMessage::ToolResult),
    );

    Ok(NodeOutput {
        update,
        payload: NodePayload::ToolResults { results },
    })
}

/// Side branch: asks for exactly five follow-up questions based on the most
/// recent user-authored message.
#[instrument(skip_all)]
async fn followup_generation(
    ctx: &TurnContext,
    state: &ConversationState,
) -> Result<NodeOutput, AppError> {
    let latest = state.latest_user_message().unwrap_or_default();
    let responder =
        StructuredResponder::new(ctx.ai_client.clone(), ctx.config.followup_model.clone());
    let output: FollowupOutput = responder
        .respond(&prompt_templates::followup_prompt(latest), followup_schema())
        .await?;

    let mut update = StateUpdate::default();
    update.followup_questions = Some(output.questions.clone());

    Ok(NodeOutput {
        update,
        payload: NodePayload::Followups {
            questions: output.questions,
        },
    })
}

/// Timeline branch: gathers web-search content from the history and runs the
/// refinement sub-workflow. Any internal error degrades to an empty timeline
/// instead of failing the turn.
#[instrument(skip_all)]
async fn timeline_generation(
    ctx: &TurnContext,
    state: &ConversationState,
) -> Result<NodeOutput, AppError> {
    let user_query = state.latest_user_message().unwrap_or_default().to_string();
    let search_info = gathered_search_content(state);

    let refinery = TimelineRefinery::new(Arc::clone(&ctx.ai_client), &ctx.config);
    let events = match refinery.run(&user_query, &search_info).await {
        Ok(events) => events,
        Err(err) => {
            warn!(error = %err, "Timeline refinement failed; returning empty timeline");
            Vec::new()
        }
    };

    let mut update = StateUpdate::default();
    update.events = Some(events.clone());

    Ok(NodeOutput {
        update,
        payload: NodePayload::Timeline { events },
    })
}

/// Concatenated web-search result bodies from this turn, used as timeline
/// generation context.
fn gathered_search_content(state: &ConversationState) -> String {
    let mut sections: Vec<String> = Vec::new();
    for entry in state.messages.iter() {
        if let TurnMessage::ToolResult(outcome) = entry {
            if outcome.name == ToolName::WebSearch.as_str() {
                sections.push(outcome.content.to_string());
            }
        }
    }
    sections.join("\n\n")
}

/// Closing node of the main branch: re-invokes the model over the extended
/// history (tool results included). A no-op under timeline mode, whose answer
/// is the generated timeline rather than a chat message.
#[instrument(skip_all)]
async fn final_response(
    ctx: &TurnContext,
    state: &ConversationState,
) -> Result<NodeOutput, AppError> {
    if state.mode() == Mode::Timeline {
        return Ok(NodeOutput::empty());
    }

    let request = chat_request(state, prompt_templates::informative_system_prompt());
    let (fragments, _) = stream_assistant_response(ctx, NodeId::FinalResponse, request).await?;

    let mut update = StateUpdate::default();
    update.response_started = !fragments.is_empty();
    update
        .messages
        .push(TurnMessage::assistant(fragments.concat(), Vec::new()));

    Ok(NodeOutput {
        update,
        payload: NodePayload::Content { fragments },
    })
}
