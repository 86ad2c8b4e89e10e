pub mod config;
pub mod errors;
pub mod models;
pub mod llm;
pub mod logging;
pub mod routes;
pub mod services;
pub mod state;
pub mod tools;

// Re-export AppState for convenience if needed elsewhere
pub use state::AppState;

// Unconditionally compiled so the integration suites in tests/ can use it.
pub mod test_helpers;
