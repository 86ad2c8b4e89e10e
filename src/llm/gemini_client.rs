use async_trait::async_trait;
use futures::StreamExt;
use genai::{
    Client, ClientBuilder,
    chat::{ChatOptions, ChatRequest, ChatResponse},
};
use std::sync::Arc;

use super::{AiClient, ChatStream};
use crate::config::Config;
use crate::errors::AppError;

/// Wrapper struct around the genai::Client to implement our AiClient trait.
pub struct AlmanacGeminiClient {
    inner: Client,
}

#[async_trait]
impl AiClient for AlmanacGeminiClient {
    async fn exec_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError> {
        self.inner
            .exec_chat(model_name, request, config_override.as_ref())
            .await
            .map_err(AppError::from)
    }

    async fn stream_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatStream, AppError> {
        let chat_stream_response = self
            .inner
            .exec_chat_stream(model_name, request, config_override.as_ref())
            .await
            .map_err(AppError::from)?;

        let inner_stream = chat_stream_response.stream;
        let mapped_stream = inner_stream.map(|result| result.map_err(AppError::from));
        let boxed_stream: ChatStream = Box::pin(mapped_stream);
        Ok(boxed_stream)
    }
}

#[async_trait]
impl AiClient for Arc<AlmanacGeminiClient> {
    async fn exec_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatResponse, AppError> {
        (**self).exec_chat(model_name, request, config_override).await
    }

    async fn stream_chat(
        &self,
        model_name: &str,
        request: ChatRequest,
        config_override: Option<ChatOptions>,
    ) -> Result<ChatStream, AppError> {
        (**self)
            .stream_chat(model_name, request, config_override)
            .await
    }
}

/// Builds the AlmanacGeminiClient wrapper. The underlying genai client reads
/// its API key from the environment; the configured key is checked up front
/// so a missing key fails at startup rather than on the first request.
pub fn build_gemini_client(config: &Config) -> Result<Arc<AlmanacGeminiClient>, AppError> {
    if config.gemini_api_key.is_none() {
        return Err(AppError::ConfigError(
            "GEMINI_API_KEY not configured".to_string(),
        ));
    }
    let client = ClientBuilder::default().build();
    Ok(Arc::new(AlmanacGeminiClient { inner: client }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = Config::default();
        let err = build_gemini_client(&config).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn configured_api_key_builds_a_client() {
        let config = Config {
            gemini_api_key: Some("test-key".to_string()),
            ..Config::default()
        };
        assert!(build_gemini_client(&config).is_ok());
    }
}
