//! Single-shot query endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::error;

use crate::agent::RunOutcome;

use super::routes::AppState;
use super::types::{QueryRequest, QueryResponse};

/// `POST /api/query`: run the full agent loop and return the final answer
/// plus the complete message list.
pub async fn query_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> (StatusCode, Json<QueryResponse>) {
    match run(&state, &request.query).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(QueryResponse::Success { data: outcome }),
        ),
        Err(err) => {
            error!(error = %format!("{:#}", err), "query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(QueryResponse::Error {
                    detail: format!("{:#}", err),
                }),
            )
        }
    }
}

async fn run(state: &AppState, query: &str) -> anyhow::Result<RunOutcome> {
    let agent = state.agent_for_run()?;
    agent.run(query, None).await
}
