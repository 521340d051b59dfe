//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No model key in the environment or the config file.
    ///
    /// Only `chat` and `ask` need one.
    #[error("missing model API key: set OPENAI_API_KEY or [model].api_key")]
    MissingApiKey,

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tool arguments on the command line are not JSON.
    #[error("invalid tool arguments: {0}")]
    Arguments(#[source] serde_json::Error),

    /// A direct `call` failed; the error JSON was already printed.
    #[error("tool failed: {kind}")]
    ToolFailed { kind: String },

    #[error(transparent)]
    Maps(#[from] maps::Error),

    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
