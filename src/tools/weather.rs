//! Weather tool backed by wttr.in's JSON interface.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

use super::{AlmanacTool, ToolError, ToolName, ToolParams, ToolResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
}

impl WeatherTool {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AlmanacTool for WeatherTool {
    fn name(&self) -> ToolName {
        ToolName::Weather
    }

    fn description(&self) -> &'static str {
        "Get current weather conditions for a city."
    }

    fn input_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City to retrieve weather for"
                }
            },
            "required": ["city"]
        })
    }

    async fn invoke(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: WeatherArgs = serde_json::from_value(params.clone())?;

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, args.city))
            .query(&[("format", "j1")])
            .send()
            .await?
            .error_for_status()?;

        let payload: JsonValue = response.json().await?;
        let current = payload
            .get("current_condition")
            .and_then(|c| c.get(0))
            .ok_or_else(|| {
                ToolError::ExecutionFailed("Malformed weather response".to_string())
            })?;

        Ok(json!({
            "city": args.city,
            "temperature_c": current["temp_C"],
            "temperature_f": current["temp_F"],
            "condition": current["weatherDesc"][0]["value"],
            "humidity": current["humidity"],
            "wind_speed_kmh": current["windspeedKmph"],
            "feels_like_c": current["FeelsLikeC"],
            "visibility": current["visibility"],
        }))
    }
}
