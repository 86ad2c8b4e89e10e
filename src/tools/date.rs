//! Current-date tool. No external calls; exists so the model can anchor
//! relative time expressions ("this week", "latest") to a real date.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use super::{AlmanacTool, ToolError, ToolName, ToolParams, ToolResult};

pub struct CurrentDateTool;

impl CurrentDateTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrentDateTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlmanacTool for CurrentDateTool {
    fn name(&self) -> ToolName {
        ToolName::CurrentDate
    }

    fn description(&self) -> &'static str {
        "Get the current date."
    }

    fn input_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn invoke(&self, _params: &ToolParams) -> Result<ToolResult, ToolError> {
        Ok(json!({ "date": Utc::now().date_naive().to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_iso_formatted_date() {
        let tool = CurrentDateTool::new();
        let result = tool.invoke(&json!({})).await.unwrap();
        let date = result["date"].as_str().unwrap();
        assert_eq!(date.len(), 10);
        assert_eq!(date.matches('-').count(), 2);
    }
}
