//! Shared helpers for unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use genai::ModelIden;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatOptions, ChatRequest, ChatResponse, ChatStreamEvent, MessageContent, StreamChunk, ToolCall,
    ToolChunk,
};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm::{AiClient, ChatStream};
use crate::services::checkpoint::MemoryCheckpointStore;
use crate::services::event_translator::ClientMessage;
use crate::state::AppState;
use crate::tools::ToolRegistry;

/// Scripted stand-in for the Gemini client. Responses and stream scripts are
/// queued per model name, so concurrent graph branches (which target
/// different models) stay deterministic; within one branch, queued entries
/// are consumed in call order.
#[derive(Clone)]
pub struct MockAiClient {
    exec_scripts: Arc<Mutex<HashMap<String, VecDeque<Result<ChatResponse, AppError>>>>>,
    stream_scripts: Arc<Mutex<HashMap<String, VecDeque<Vec<Result<ChatStreamEvent, AppError>>>>>>,
    exec_calls: Arc<Mutex<Vec<String>>>,
    requests_by_model: Arc<Mutex<HashMap<String, Vec<Vec<genai::chat::ChatMessage>>>>>,
}

impl MockAiClient {
    pub fn new() -> Self {
        Self {
            exec_scripts: Arc::new(Mutex::new(HashMap::new())),
            stream_scripts: Arc::new(Mutex::new(HashMap::new())),
            exec_calls: Arc::new(Mutex::new(Vec::new())),
            requests_by_model: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn queue_response(&self, model_name: &str, response: Result<ChatResponse, AppError>) {
        self.exec_scripts
            .lock()
            .unwrap()
            .entry(model_name.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn queue_stream(&self, model_name: &str, items: Vec<Result<ChatStreamEvent, AppError>>) {
        self.stream_scripts
            .lock()
            .unwrap()
            .entry(model_name.to_string())
            .or_default()
            .push_back(items);
    }

    /// Model names `exec_chat` has been called with, in call order.
    pub fn exec_calls(&self) -> Vec<String> {
        self.exec_calls.lock().unwrap().clone()
    }

    /// Message lists received for one model, in call order, across both
    /// `exec_chat` and `stream_chat`. Concurrent branches target different
    /// models, so per-model views stay deterministic.
    pub fn requests_for(&self, model_name: &str) -> Vec<Vec<genai::chat::ChatMessage>> {
        self.requests_by_model
            .lock()
            .unwrap()
            .get(model_name)
            .cloned()
            .unwrap_or_default()
    }

    fn record_request(&self, model_name: &str, request: &ChatRequest) {
        self.requests_by_model
            .lock()
            .unwrap()
            .entry(model_name.to_string())
            .or_default()
            .push(request.messages.clone());
    }
}

impl Default for MockAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiClient for MockAiClient {
    async fn exec_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        _config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError> {
        self.record_request(model_name, &request);
        self.exec_calls.lock().unwrap().push(model_name.to_string());

        let queued = self
            .exec_scripts
            .lock()
            .unwrap()
            .get_mut(model_name)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(response) => response,
            None => Ok(text_response("Mock AI response")),
        }
    }

    async fn stream_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        _config_override: Option<ChatOptions>,
    ) -> Result<ChatStream, AppError> {
        self.record_request(model_name, &request);

        let queued = self
            .stream_scripts
            .lock()
            .unwrap()
            .get_mut(model_name)
            .and_then(VecDeque::pop_front);
        let items = match queued {
            Some(items) => items,
            None => stream_script(&["Mock AI response"], Vec::new()),
        };

        let stream = futures::stream::iter(items);
        Ok(Box::pin(stream) as ChatStream)
    }
}

/// A plain-text chat response shaped the way the Gemini adapter returns it.
pub fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        model_iden: ModelIden::new(AdapterKind::Gemini, "gemini/mock-model"),
        provider_model_iden: ModelIden::new(AdapterKind::Gemini, "gemini/mock-model"),
        content: MessageContent::from_text(text),
        reasoning_content: None,
        stop_reason: None,
        usage: Default::default(),
        captured_raw_body: None,
        response_id: None,
    }
}

/// A structured-output response: the JSON value serialized as response text.
pub fn json_response(value: &JsonValue) -> ChatResponse {
    text_response(&value.to_string())
}

/// Builds one streaming script: a start event, one chunk per fragment, the
/// given tool calls, and an end event. `ChatStreamEvent` is not `Clone`, so
/// scripts are built fresh per queue entry.
pub fn stream_script(
    fragments: &[&str],
    tool_calls: Vec<(&str, &str, JsonValue)>,
) -> Vec<Result<ChatStreamEvent, AppError>> {
    let mut items: Vec<Result<ChatStreamEvent, AppError>> = vec![Ok(ChatStreamEvent::Start)];
    for fragment in fragments {
        items.push(Ok(ChatStreamEvent::Chunk(StreamChunk {
            content: (*fragment).to_string(),
        })));
    }
    for (call_id, fn_name, fn_arguments) in tool_calls {
        items.push(Ok(ChatStreamEvent::ToolCallChunk(ToolChunk {
            tool_call: ToolCall {
                call_id: call_id.to_string(),
                fn_name: fn_name.to_string(),
                fn_arguments,
                thought_signatures: None,
            },
        })));
    }
    items.push(Ok(ChatStreamEvent::End(Default::default())));
    items
}

/// A configuration suitable for tests; no environment access.
pub fn test_config() -> Config {
    Config {
        gemini_api_key: Some("test-key".to_string()),
        ..Config::default()
    }
}

/// Assembles an `AppState` around a mock client and the given registry,
/// backed by an in-memory checkpoint store.
pub fn test_app_state(mock: Arc<MockAiClient>, registry: ToolRegistry) -> AppState {
    AppState::new(
        Arc::new(test_config()),
        mock,
        Arc::new(registry),
        MemoryCheckpointStore::new(),
    )
}

/// Parses an SSE response body into client messages, skipping keep-alives
/// and blank lines.
pub fn parse_sse_messages(body: &str) -> Vec<ClientMessage> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|data| !data.is_empty() && *data != "keep-alive")
        .filter_map(|data| serde_json::from_str::<ClientMessage>(data).ok())
        .collect()
}
