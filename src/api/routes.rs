//! Router assembly and shared state.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::agent::Agent;
use crate::config::Config;
use crate::llm::{LlmClient, OpenRouterClient};
use crate::store::{load_registry, StoreError, ToolStore};

use super::types::HealthResponse;
use super::{query, stream};

/// State shared by all handlers.
///
/// The store handle is the only shared write target; every run builds its
/// own frozen registry from it.
pub struct AppState {
    pub config: Config,
    pub llm: Arc<dyn LlmClient>,
    pub store: ToolStore,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let llm = Arc::new(OpenRouterClient::new(config.api_key.clone()));
        let store = ToolStore::new(config.store_path.clone());
        Arc::new(Self { config, llm, store })
    }

    /// Load the catalogue and freeze it into an agent for one run.
    pub fn agent_for_run(&self) -> Result<Agent, StoreError> {
        let registry = load_registry(&self.store, self.config.search_result_limit, None)?;
        Ok(Agent::new(
            &self.config,
            Arc::clone(&self.llm),
            Arc::new(registry),
        ))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query::query_agent))
        .route("/ws/query", get(stream::query_ws))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server and run until shutdown.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config);

    state.store.ensure_seeded().await?;

    // Fail fast on an unloadable store before accepting traffic.
    let registry = load_registry(&state.store, state.config.search_result_limit, None)?;
    info!(tools = registry.len(), "tool catalogue loaded");

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
