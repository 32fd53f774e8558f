//! HTTP and WebSocket transport for the agent.

pub mod query;
pub mod routes;
pub mod stream;
pub mod types;

pub use routes::{serve, AppState};
