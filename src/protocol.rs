//! The model-facing tool-call protocol.
//!
//! A model reply may embed one fenced ```json block containing a JSON array
//! of requested tool calls. No fence means the reply is final. A fence that
//! fails to parse is a protocol error, surfaced distinctly so the loop can
//! correct the model instead of mistaking the reply for a final answer.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

/// A single tool invocation requested by the model.
///
/// Consumed immediately by the agent loop; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Registry name of the requested tool
    pub name: String,

    /// The string-encoded argument bundle (the `input` key of `args`)
    pub input: String,

    /// Caller-chosen identifier echoed back on the result message
    pub id: String,
}

/// A present-but-unusable tool-call block.
#[derive(Debug, Error)]
pub enum ProtocolParseError {
    #[error("tool-call block is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("tool-call block must be a JSON array of objects")]
    NotAnArray,

    #[error("tool call #{index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// Extract the requested tool calls from a model reply.
///
/// Returns an empty sequence when the reply carries no ```json fence (the
/// reply is final). Ordering within the block is preserved; the loop executes
/// calls strictly in that order.
pub fn extract_tool_calls(reply: &str) -> Result<Vec<ToolCallRequest>, ProtocolParseError> {
    let Some(captures) = FENCE_RE.captures(reply) else {
        return Ok(Vec::new());
    };

    let body = captures[1].trim();
    let value: serde_json::Value = serde_json::from_str(body)?;
    let items = value.as_array().ok_or(ProtocolParseError::NotAnArray)?;

    let mut calls = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let name = item
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or(ProtocolParseError::MissingField { index, field: "name" })?;
        let args = item
            .get("args")
            .and_then(|v| v.as_object())
            .ok_or(ProtocolParseError::MissingField { index, field: "args" })?;
        let input = args
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or(ProtocolParseError::MissingField {
                index,
                field: "args.input",
            })?;
        let id = item
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(ProtocolParseError::MissingField { index, field: "id" })?;

        calls.push(ToolCallRequest {
            name: name.to_string(),
            input: input.to_string(),
            id: id.to_string(),
        });
    }

    Ok(calls)
}
