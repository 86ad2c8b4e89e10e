//! Crypto market data tool backed by the CoinGecko simple-price endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;

use super::{AlmanacTool, ToolError, ToolName, ToolParams, ToolResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CryptoPriceTool {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CryptoPriceArgs {
    coin_id: String,
    #[serde(default = "default_vs_currency")]
    vs_currency: String,
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

impl CryptoPriceTool {
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
impl AlmanacTool for CryptoPriceTool {
    fn name(&self) -> ToolName {
        ToolName::CryptoPrice
    }

    fn description(&self) -> &'static str {
        "Get the current price and basic market data for a cryptocurrency. \
         Uses CoinGecko coin ids such as 'bitcoin' or 'ethereum'."
    }

    fn input_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "coin_id": {
                    "type": "string",
                    "description": "CoinGecko coin id, e.g. 'bitcoin'"
                },
                "vs_currency": {
                    "type": "string",
                    "description": "Currency to price against, default 'usd'"
                }
            },
            "required": ["coin_id"]
        })
    }

    async fn invoke(&self, params: &ToolParams) -> Result<ToolResult, ToolError> {
        let args: CryptoPriceArgs = serde_json::from_value(params.clone())?;

        let response = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[
                ("ids", args.coin_id.as_str()),
                ("vs_currencies", args.vs_currency.as_str()),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload: JsonValue = response.json().await?;
        let data = payload.get(&args.coin_id).ok_or_else(|| {
            ToolError::ExecutionFailed(format!("Coin '{}' not found", args.coin_id))
        })?;

        let currency = args.vs_currency.as_str();
        Ok(json!({
            "coin": args.coin_id,
            "currency": currency.to_uppercase(),
            "price": data.get(currency).cloned().unwrap_or(JsonValue::from(0)),
            "market_cap": data
                .get(format!("{currency}_market_cap"))
                .cloned()
                .unwrap_or(JsonValue::from(0)),
            "volume_24h": data
                .get(format!("{currency}_24h_vol"))
                .cloned()
                .unwrap_or(JsonValue::from(0)),
            "price_change_24h": data
                .get(format!("{currency}_24h_change"))
                .cloned()
                .unwrap_or(JsonValue::from(0)),
        }))
    }
}
