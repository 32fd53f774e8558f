//! Events emitted per agent-loop transition.

use serde::Serialize;

/// One step of an agent run, streamed to transport clients as it occurs.
///
/// `Final` and `Error` are terminal: exactly one of them ends every event
/// stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The model produced a reply (which may contain a tool-call block).
    ModelReply { content: String },

    /// A requested tool is about to be dispatched.
    ToolCall {
        id: String,
        name: String,
        input: String,
    },

    /// A tool finished; `is_error` marks failures recovered into content.
    ToolResult {
        id: String,
        name: String,
        content: String,
        is_error: bool,
    },

    /// The run finished with a final answer.
    Final { content: String },

    /// The run failed.
    Error { message: String },
}
