//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::agent::RunOutcome;

/// Body accepted by both the single-shot and streaming endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// The natural-language query (`message` accepted as an alias)
    #[serde(alias = "message")]
    pub query: String,
}

/// Envelope returned by the single-shot endpoint.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryResponse {
    Success { data: RunOutcome },
    Error { detail: String },
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,

    /// Service version
    pub version: &'static str,
}
