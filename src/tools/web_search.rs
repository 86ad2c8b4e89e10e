//! Web search tool, a thin stateless wrapper over a Tavily-style REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

use super::{AlmanacTool, ToolError, ToolName, ToolParams, ToolResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
}

fn default_max_results() -> u32 {
    15
}

impl WebSearchTool {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl AlmanacTool for WebSearchTool {
    fn name(&self) -> ToolName {
        ToolName::WebSearch
    }

    fn description(&self) -> &'static str {
        "Search the web for current information. Returns result items with \
         title, url and content, plus related image URLs."
    }

    fn input_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 25,
                    "description": "Number of results to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: WebSearchArgs = serde_json::from_value(params.clone())?;

        let body = json!({
            "api_key": self.api_key.as_deref().unwrap_or_default(),
            "query": args.query,
            "max_results": args.max_results,
            "search_depth": "advanced",
            "include_images": true,
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: JsonValue = response.json().await?;

        // Pass the provider's result/image lists through; consumers parse the
        // item shape themselves.
        Ok(json!({
            "results": payload.get("results").cloned().unwrap_or_else(|| json!([])),
            "images": payload.get("images").cloned().unwrap_or_else(|| json!([])),
        }))
    }
}
