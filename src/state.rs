use std::sync::Arc;

use crate::config::Config;
use crate::llm::AiClient;
use crate::services::checkpoint::CheckpointStore;
use crate::tools::ToolRegistry;

// --- Shared application state ---
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ai_client: Arc<dyn AiClient>,
    pub tool_registry: Arc<ToolRegistry>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        ai_client: Arc<dyn AiClient>,
        tool_registry: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            config,
            ai_client,
            tool_registry,
            checkpoints,
        }
    }
}
