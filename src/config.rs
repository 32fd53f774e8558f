//! Configuration management for toolflow.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `DEFAULT_MODEL` - Optional. The default model to use. Defaults to `google/gemini-2.5-flash`.
//! - `TOOL_STORE_PATH` - Optional. Path to the YAML tool store. Defaults to `tools/tool_store.yaml`.
//! - `SYSTEM_PROMPT_PATH` - Optional. File whose contents replace the default
//!   system-prompt preamble. If set but unreadable, startup fails.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop round-trips. Defaults to `10`.
//! - `SEARCH_RESULT_LIMIT` - Optional. Web search results per query. Defaults to `3`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to read {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Agent server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Default model identifier (OpenRouter format)
    pub default_model: String,

    /// Path to the YAML tool store
    pub store_path: PathBuf,

    /// Operator-supplied system-prompt preamble, if any
    pub system_preamble: Option<String>,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum round-trips for the agent loop
    pub max_iterations: usize,

    /// Web search results returned per query
    pub search_result_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not
    /// set, and `ConfigError::UnreadableFile` if `SYSTEM_PROMPT_PATH` points
    /// at a file that cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let default_model = std::env::var("DEFAULT_MODEL")
            .unwrap_or_else(|_| "google/gemini-2.5-flash".to_string());

        let store_path = std::env::var("TOOL_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tools/tool_store.yaml"));

        let system_preamble = match std::env::var("SYSTEM_PROMPT_PATH") {
            Ok(path) => {
                let path = PathBuf::from(path);
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::UnreadableFile { path, source })?;
                Some(text)
            }
            Err(_) => None,
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
            })?;

        let search_result_limit = std::env::var("SEARCH_RESULT_LIMIT")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("SEARCH_RESULT_LIMIT".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            api_key,
            default_model,
            store_path,
            system_preamble,
            host,
            port,
            max_iterations,
            search_result_limit,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String, store_path: PathBuf) -> Self {
        Self {
            api_key,
            default_model,
            store_path,
            system_preamble: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_iterations: 10,
            search_result_limit: 3,
        }
    }
}
