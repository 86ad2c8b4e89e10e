use axum::Json;
use axum::extract::State;

use crate::state::AppState;
use crate::tools::ToolInfo;

/// GET /api/debug/tools - the registered tool set, names and schemas.
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    Json(state.tool_registry.describe())
}
