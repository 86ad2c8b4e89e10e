// src/errors.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Application-wide error taxonomy.
///
/// External error types are wrapped as `String` so the enum stays `Clone`
/// (streamed error events may need to carry a copy across task boundaries).
#[derive(Error, Debug, Clone)]
pub enum AppError {
    // --- Request/Input Errors ---
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    // --- Tool Errors ---
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    // --- LLM Errors ---
    #[error("LLM API error: {0}")]
    GeminiError(String),

    #[error("Structured output violated its schema: {0}")]
    SchemaViolation(String),

    // --- Orchestration Errors ---
    #[error("Sub-workflow failed: {0}")]
    SubWorkflowFailed(String),

    #[error("Event translation error: {0}")]
    TranslationError(String),

    // --- General/Internal Errors ---
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("HTTP Request Error: {0}")]
    HttpRequestError(String),

    #[error("Serialization Error: {0}")]
    SerializationError(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl From<genai::Error> for AppError {
    fn from(err: genai::Error) -> Self {
        AppError::GeminiError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpRequestError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) | AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::UnknownTool(name) => {
                (StatusCode::BAD_REQUEST, format!("Unknown tool: {name}"))
            }
            AppError::GeminiError(_)
            | AppError::SchemaViolation(_)
            | AppError::HttpRequestError(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service error".to_string(),
            ),
            AppError::SubWorkflowFailed(_)
            | AppError::TranslationError(_)
            | AppError::ConfigError(_)
            | AppError::SerializationError(_)
            | AppError::InternalServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        error!(error = ?self, status = %status, "Request failed");

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let response = AppError::BadRequest("message cannot be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let response =
            AppError::InternalServerError("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn sub_workflow_failures_map_to_500() {
        let response = AppError::SubWorkflowFailed("timeline generation".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn llm_errors_map_to_bad_gateway() {
        let response = AppError::GeminiError("quota exceeded".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
