// src/llm/structured.rs
//
// Schema-constrained model invocation. The model output is validated by
// deserializing into the requested type; on failure the call is retried once
// before a SchemaViolation is surfaced to the caller. A structurally invalid
// value is never returned.

use genai::chat::{
    ChatMessage, ChatOptions, ChatRequest, ChatResponseFormat, JsonSpec,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

use super::AiClient;
use crate::errors::AppError;

pub struct StructuredResponder {
    ai_client: Arc<dyn AiClient>,
    model_name: String,
}

impl StructuredResponder {
    pub fn new(ai_client: Arc<dyn AiClient>, model_name: impl Into<String>) -> Self {
        Self {
            ai_client,
            model_name: model_name.into(),
        }
    }

    /// Invokes the model constrained to `schema` and deserializes the result
    /// into `T`. Stateless across invocations; all context lives in `prompt`.
    pub async fn respond<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: JsonValue,
    ) -> Result<T, AppError> {
        match self.attempt::<T>(prompt, schema.clone()).await {
            Ok(value) => Ok(value),
            Err(AppError::SchemaViolation(first_failure)) => {
                warn!(
                    model = %self.model_name,
                    error = %first_failure,
                    "Structured output failed validation, retrying once"
                );
                self.attempt::<T>(prompt, schema).await
            }
            Err(other) => Err(other),
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: JsonValue,
    ) -> Result<T, AppError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]);

        let json_schema_spec = JsonSpec::new("structured_output", schema);
        let response_format = ChatResponseFormat::JsonSpec(json_schema_spec);

        let options = ChatOptions {
            response_format: Some(response_format),
            ..Default::default()
        };

        let response = self
            .ai_client
            .exec_chat(&self.model_name, request, Some(options))
            .await?;

        let text = response
            .first_text()
            .ok_or_else(|| {
                AppError::SchemaViolation("No text content in structured response".to_string())
            })?
            .to_string();

        debug!(model = %self.model_name, response_len = text.len(), "Parsing structured output");

        serde_json::from_str::<T>(&text).map_err(|e| {
            AppError::SchemaViolation(format!("Failed to parse structured output: {e}"))
        })
    }
}
