//! # toolflow
//!
//! A tool-calling agent server: an HTTP API accepts a natural-language
//! query, an agent loop alternates model inference with tool dispatch, and
//! the tools come from a YAML-backed catalogue that the model itself can
//! extend with new data-driven numeric tools.
//!
//! This library provides:
//! - An HTTP + WebSocket API for query submission and event streaming
//! - A tool registry built fresh per run from the on-disk store
//! - A text-based tool-call protocol (fenced JSON blocks in model replies)
//!
//! ## Architecture
//!
//! Each query runs the "tools in a loop" pattern:
//! 1. Load the tool catalogue from the store and freeze it for the run
//! 2. Seed the conversation with the catalogue-bearing system prompt
//! 3. Call the model, parse the reply's tool-call block, dispatch in order
//! 4. Feed results back and repeat until the model answers without a call
//!
//! ## Example
//!
//! ```rust,ignore
//! use toolflow::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod protocol;
pub mod store;
pub mod tools;

pub use config::Config;
