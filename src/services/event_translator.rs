//! Translates the orchestrator's raw node-lifecycle events into the
//! client-facing message sequence.
//!
//! Arrival order is preserved; the only buffering is the per-turn set of
//! already-sent content fragments, which guards against the same fragment
//! being re-observed across overlapping raw events.

use std::collections::HashSet;

use async_stream::stream;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tracing::warn;

use crate::errors::AppError;
use crate::models::ToolOutcome;
use crate::services::orchestrator::{NodeId, NodePayload, RawEvent, TurnHandle};
use crate::services::source_metadata::{extract_site_name, favicon_url};
use crate::services::structured_output::TimelineEvent;
use crate::tools::ToolName;

/// One web-search hit, enriched with display metadata derived from its URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSource {
    pub title: String,
    pub url: String,
    pub site_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// The client-facing message vocabulary. Serialized as JSON objects with a
/// `type` tag, one per SSE event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Checkpoint { checkpoint_id: String },
    SearchStart,
    SearchResults {
        sources: Vec<SearchSource>,
        images: Vec<JsonValue>,
    },
    TimelineGenerationStart,
    TimelineContent { events: Vec<TimelineEvent> },
    FollowupQuestions { questions: Vec<String> },
    Content { content: String },
    End,
    Error { message: String },
}

/// Stateful per-turn translator. One instance per client stream.
pub struct EventTranslator {
    sent_fragments: HashSet<String>,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self {
            sent_fragments: HashSet::new(),
        }
    }

    /// Translates one raw event into zero or more client messages.
    pub fn translate(&mut self, event: &RawEvent) -> Vec<ClientMessage> {
        match event {
            RawEvent::NodeStarted { node } => match node {
                NodeId::ToolDispatch => vec![ClientMessage::SearchStart],
                NodeId::TimelineGeneration => vec![ClientMessage::TimelineGenerationStart],
                _ => Vec::new(),
            },
            RawEvent::NodeStreaming { node, payload }
            | RawEvent::NodeCompleted { node, payload } => self.translate_payload(*node, payload),
        }
    }

    fn translate_payload(&mut self, node: NodeId, payload: &NodePayload) -> Vec<ClientMessage> {
        match payload {
            NodePayload::Empty => Vec::new(),
            NodePayload::Content { fragments } => fragments
                .iter()
                .filter(|fragment| self.sent_fragments.insert((*fragment).clone()))
                .map(|fragment| ClientMessage::Content {
                    content: fragment.clone(),
                })
                .collect(),
            NodePayload::ToolResults { results } => results
                .iter()
                .filter(|outcome| outcome.name == ToolName::WebSearch.as_str())
                .filter_map(|outcome| match search_results_message(outcome) {
                    Ok(message) => Some(message),
                    Err(err) => {
                        warn!(%node, call_id = %outcome.call_id, error = %err, "Unparseable search result payload");
                        None
                    }
                })
                .collect(),
            NodePayload::Timeline { events } => {
                if node == NodeId::TimelineGeneration {
                    vec![ClientMessage::TimelineContent {
                        events: events.clone(),
                    }]
                } else {
                    Vec::new()
                }
            }
            NodePayload::Followups { questions } => vec![ClientMessage::FollowupQuestions {
                questions: questions.clone(),
            }],
            NodePayload::Failed { message } => vec![ClientMessage::Error {
                message: message.clone(),
            }],
        }
    }
}

impl Default for EventTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a `search_results` message from one web-search outcome, deriving
/// site name and favicon from each hit's URL without network calls.
fn search_results_message(outcome: &ToolOutcome) -> Result<ClientMessage, AppError> {
    let results = outcome
        .content
        .get("results")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| {
            AppError::TranslationError("search payload is missing a results array".to_string())
        })?;

    let sources: Vec<SearchSource> = results
        .iter()
        .filter_map(|item| {
            let url = item.get("url").and_then(JsonValue::as_str)?;
            Some(SearchSource {
                title: item
                    .get("title")
                    .and_then(JsonValue::as_str)
                    .unwrap_or(url)
                    .to_string(),
                url: url.to_string(),
                site_name: extract_site_name(url),
                favicon: favicon_url(url),
            })
        })
        .collect();

    let images = outcome
        .content
        .get("images")
        .and_then(JsonValue::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(ClientMessage::SearchResults { sources, images })
}

/// The per-turn client message stream. Owns the turn handle so dropping the
/// stream (client disconnect) cancels the graph's outstanding tasks. Emits
/// the fresh checkpoint identifier, when one was minted for this turn,
/// before anything else, and always closes with `end`.
pub fn client_message_stream(
    mut raw_events: mpsc::UnboundedReceiver<RawEvent>,
    turn: TurnHandle,
    minted_checkpoint: Option<String>,
) -> impl Stream<Item = ClientMessage> {
    stream! {
        let _turn = turn;
        if let Some(checkpoint_id) = minted_checkpoint {
            yield ClientMessage::Checkpoint { checkpoint_id };
        }
        let mut translator = EventTranslator::new();
        while let Some(raw) = raw_events.recv().await {
            for message in translator.translate(&raw) {
                yield message;
            }
        }
        yield ClientMessage::End;
    }
}
