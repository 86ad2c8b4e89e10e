use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use almanac_backend::config::Config;
use almanac_backend::llm::gemini_client::build_gemini_client;
use almanac_backend::logging::init_subscriber;
use almanac_backend::routes::app_router;
use almanac_backend::services::checkpoint::MemoryCheckpointStore;
use almanac_backend::state::AppState;
use almanac_backend::tools::default_registry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_subscriber();

    let config = Arc::new(Config::load().context("Failed to load configuration")?);
    let ai_client = build_gemini_client(&config).context("Failed to build Gemini client")?;
    let tool_registry =
        Arc::new(default_registry(&config).context("Failed to build tool registry")?);
    let checkpoints = MemoryCheckpointStore::new();

    let state = AppState::new(config.clone(), ai_client, tool_registry, checkpoints);

    let app = app_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
