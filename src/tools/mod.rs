//! Tool abstraction and registry.
//!
//! A tool is a named, single-argument capability exposed to the model. The
//! registry maps names to tools and is built fresh per agent run by
//! [`crate::store::load_registry`], then treated as immutable for the run.

pub mod generator;
pub mod math;
pub mod ops;
pub mod search;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Names reserved by the builtin tools; store records may not shadow them.
pub const BUILTIN_TOOL_NAMES: [&str; 4] =
    ["web_search", "solve_quadratic", "tool_generator", "tool_lookup"];

/// Return type a tool declares in the model-facing catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Float,
    Str,
}

impl ReturnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnType::Float => "float",
            ReturnType::Str => "str",
        }
    }
}

/// A named, single-argument capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique registry name (lowercase, underscore-separated).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// Declared return type for the catalogue.
    fn return_type(&self) -> ReturnType;

    /// Execute with the string-encoded argument bundle.
    async fn execute(&self, input: &str) -> anyhow::Result<String>;
}

/// Catalogue entry used to build the system prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub return_type: ReturnType,
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a tool named `{0}` is already registered")]
    Duplicate(String),
}

/// Name → tool mapping. Built fresh per load, read-only afterwards.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Add a tool under its declared name.
    ///
    /// Duplicate names are rejected; the existing entry stays resolvable
    /// unchanged.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The catalogue shown to the model, sorted by name.
    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                return_type: tool.return_type(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
