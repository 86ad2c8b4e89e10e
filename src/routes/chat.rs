use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::errors::AppError;
use crate::models::{Mode, Topic, TurnRequest};
use crate::services::checkpoint::new_checkpoint_id;
use crate::services::event_translator::{ClientMessage, client_message_stream};
use crate::services::orchestrator::{
    ConversationState, OrchestrationGraph, TurnContext, TurnHandle,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatStreamParams {
    #[serde(default)]
    pub topic: Topic,
    #[serde(default)]
    pub mode: Mode,
    pub checkpoint_id: Option<String>,
}

/// GET /chat_stream/{message} - Server-Sent Events for one conversation turn.
///
/// Runs the orchestration graph in a background task and streams translated
/// client messages as they arrive. Dropping the response stream (client
/// disconnect) cancels the turn's outstanding work.
#[instrument(skip(state), fields(topic = ?params.topic, mode = ?params.mode))]
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(message): Path<String>,
    Query(params): Query<ChatStreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let request = TurnRequest {
        message,
        topic: params.topic,
        mode: params.mode,
        checkpoint_id: params.checkpoint_id,
    };
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest(
            "message must not be blank".to_string(),
        ));
    }

    // A supplied checkpoint resumes that conversation; otherwise a fresh
    // identifier is minted and announced as the first stream message.
    let (checkpoint_id, minted) = match request.checkpoint_id {
        Some(id) => (id, None),
        None => {
            let id = new_checkpoint_id();
            (id.clone(), Some(id))
        }
    };
    let history = state.checkpoints.load(&checkpoint_id).await;
    info!(
        %checkpoint_id,
        history_len = history.len(),
        "Starting conversation turn"
    );

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let ctx = TurnContext {
        ai_client: state.ai_client.clone(),
        registry: state.tool_registry.clone(),
        config: state.config.clone(),
        raw_events: raw_tx,
    };
    let conversation =
        ConversationState::new(history, &request.message, request.topic, request.mode);

    let checkpoints = Arc::clone(&state.checkpoints);
    let handle = tokio::spawn(async move {
        let graph = OrchestrationGraph::new(ctx);
        let final_state = graph.run_turn(conversation).await;
        checkpoints
            .save(&checkpoint_id, final_state.messages.into_vec())
            .await;
    });

    let stream = client_message_stream(raw_rx, TurnHandle::new(handle), minted)
        .map(to_sse_event);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn to_sse_event(message: ClientMessage) -> Result<Event, axum::Error> {
    Event::default().json_data(&message).map_err(|err| {
        error!(error = %err, "Failed to serialize client message");
        err
    })
}
