//! The tool framework: a closed set of tool identities, the tool trait, and
//! the registry that dispatches model-issued calls.
//!
//! Tool identity is a statically enumerated variant rather than a free-form
//! string: an unrecognized registry entry is rejected at construction time,
//! and an unrecognized name at dispatch time is skipped with a warning
//! instead of aborting the batch.

pub mod crypto_markets;
pub mod date;
pub mod web_search;
pub mod weather;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Mode, ToolCallRecord, ToolOutcome, Topic};

/// Tool parameters, expected to be a JSON object.
pub type ToolParams = JsonValue;
/// The payload a tool produces.
pub type ToolResult = JsonValue;

/// The closed set of tools this service exposes to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    WebSearch,
    Weather,
    CryptoPrice,
    CurrentDate,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::WebSearch,
        ToolName::Weather,
        ToolName::CryptoPrice,
        ToolName::CurrentDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::WebSearch => "web_search",
            ToolName::Weather => "get_weather",
            ToolName::CryptoPrice => "get_crypto_price",
            ToolName::CurrentDate => "get_date",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web_search" => Ok(ToolName::WebSearch),
            "get_weather" => Ok(ToolName::Weather),
            "get_crypto_price" => Ok(ToolName::CryptoPrice),
            "get_date" => Ok(ToolName::CurrentDate),
            other => Err(AppError::UnknownTool(other.to_string())),
        }
    }
}

/// An error that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The provided parameters do not match the tool's input schema.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    /// An error occurred during the tool's execution (network failures and
    /// timeouts included).
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidParams(format!("JSON error: {err}"))
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::ExecutionFailed(err.to_string())
    }
}

/// A tool invocable by the orchestration graph on the model's behalf.
///
/// The `description` and `input_schema` are what the model sees; they decide
/// when and how the tool gets called.
#[async_trait]
pub trait AlmanacTool: Send + Sync {
    fn name(&self) -> ToolName;

    fn description(&self) -> &'static str;

    /// JSON schema describing the expected input parameters.
    fn input_schema(&self) -> JsonValue;

    async fn invoke(&self, params: &ToolParams) -> Result<ToolResult, ToolError>;
}

/// Turn-scoped parameters injected into tool arguments at dispatch time.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext {
    pub topic: Topic,
    pub mode: Mode,
}

impl DispatchContext {
    /// Result-count bound for web search. Timeline mode takes precedence over
    /// the topic-derived bounds.
    pub fn search_result_budget(&self) -> u32 {
        if self.mode == Mode::Timeline {
            25
        } else if self.topic == Topic::News {
            20
        } else {
            15
        }
    }
}

/// Description of one registered tool, for the debug listing endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: JsonValue,
}

/// Maps each tool identity to its invocable implementation.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Arc<dyn AlmanacTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool. Duplicate registrations are rejected.
    pub fn register(&mut self, tool: Arc<dyn AlmanacTool>) -> Result<(), AppError> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(AppError::InvalidInput(format!(
                "Tool '{name}' is already registered"
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: ToolName) -> Option<Arc<dyn AlmanacTool>> {
        self.tools.get(&name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool declarations for a chat request, in a stable order.
    pub fn tool_specs(&self) -> Vec<genai::chat::Tool> {
        ToolName::ALL
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                genai::chat::Tool::new(tool.name().as_str())
                    .with_description(tool.description())
                    .with_schema(tool.input_schema())
            })
            .collect()
    }

    /// Tool descriptions for the debug listing endpoint, in a stable order.
    pub fn describe(&self) -> Vec<ToolInfo> {
        ToolName::ALL
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Dispatches a single call. An unknown tool name is surfaced as
    /// `AppError::UnknownTool`; an invocation failure is captured as an
    /// error-shaped outcome so the model can see and adapt to it.
    pub async fn dispatch(
        &self,
        call: &ToolCallRecord,
        context: &DispatchContext,
    ) -> Result<ToolOutcome, AppError> {
        let name = ToolName::from_str(&call.name)?;
        let tool = self
            .get(name)
            .ok_or_else(|| AppError::UnknownTool(call.name.clone()))?;

        let params = inject_context(name, call.arguments.clone(), context);

        info!(tool = %name, call_id = %call.call_id, "Dispatching tool call");

        let content = match tool.invoke(&params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, call_id = %call.call_id, error = %e, "Tool invocation failed");
                serde_json::json!({ "error": e.to_string() })
            }
        };

        Ok(ToolOutcome {
            name: name.to_string(),
            call_id: call.call_id.clone(),
            content,
        })
    }

    /// Dispatches a batch of sibling calls concurrently and collects their
    /// outcomes in call-completion order. Unknown tool names are skipped with
    /// a warning; the remaining calls proceed.
    pub async fn dispatch_batch(
        &self,
        calls: &[ToolCallRecord],
        context: &DispatchContext,
    ) -> Vec<ToolOutcome> {
        let mut in_flight: FuturesUnordered<_> = calls
            .iter()
            .map(|call| self.dispatch(call, context))
            .collect();

        let mut outcomes = Vec::with_capacity(calls.len());
        while let Some(result) = in_flight.next().await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(AppError::UnknownTool(name)) => {
                    warn!(tool = %name, "Skipping call to unknown tool");
                }
                Err(e) => {
                    // Dispatch only fails on unknown names today; anything
                    // else is still not allowed to abort the batch.
                    warn!(error = %e, "Tool dispatch error, skipping call");
                }
            }
        }
        outcomes
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Injects turn-scoped parameters into a tool's arguments where the tool
/// requires them.
fn inject_context(name: ToolName, mut params: ToolParams, context: &DispatchContext) -> ToolParams {
    if name == ToolName::WebSearch {
        if let Some(map) = params.as_object_mut() {
            map.insert(
                "max_results".to_string(),
                JsonValue::from(context.search_result_budget()),
            );
        }
    }
    params
}

/// Builds the production registry from configuration.
pub fn default_registry(config: &Config) -> Result<ToolRegistry, AppError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(web_search::WebSearchTool::new(
        &config.search_api_base_url,
        config.search_api_key.clone(),
    )))?;
    registry.register(Arc::new(weather::WeatherTool::new(
        &config.weather_api_base_url,
    )))?;
    registry.register(Arc::new(crypto_markets::CryptoPriceTool::new(
        &config.crypto_api_base_url,
    )))?;
    registry.register(Arc::new(date::CurrentDateTool::new()))?;
    Ok(registry)
}
