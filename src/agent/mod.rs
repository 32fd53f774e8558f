//! Agent module - the loop alternating model inference and tool dispatch.
//!
//! 1. Seed the conversation with the system prompt (tool catalogue) and the
//!    user's query
//! 2. Call the model; parse the reply for a fenced tool-call block
//! 3. If calls are present, dispatch them in declared order and feed each
//!    result back into the conversation
//! 4. Repeat until the model replies without a tool call, or the iteration
//!    cap is hit

mod agent_loop;
mod events;
mod prompt;

pub use agent_loop::{Agent, RunOutcome};
pub use events::AgentEvent;
pub use prompt::build_system_prompt;
