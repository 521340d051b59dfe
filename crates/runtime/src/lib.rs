//! mapassist runtime: model backends, tool hosts and the assistant loop.
//!
//! # Overview
//!
//! - **Backend**: a trait abstracting LLM providers. [`OpenAiBackend`] speaks
//!   the chat completions protocol.
//! - **ToolHost**: what runs a tool call. [`MapToolHost`] dispatches to the
//!   map servers through a [`maps::Toolbox`].
//! - **Assistant**: keeps the conversation and loops model -> tools -> model
//!   until the model answers.
//!
//! # Example
//!
//! ```ignore
//! use maps::{GeoLookupServer, RouteServer, ServerParams, Toolbox};
//! use runtime::{Assistant, MapToolHost, OpenAiBackend};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let geo = GeoLookupServer::new(ServerParams::nominatim(), maps::DEFAULT_OVERPASS_URL)?;
//! let route = RouteServer::new(ServerParams::openrouteservice())?;
//! let host = MapToolHost::new(Toolbox::new(Arc::new(geo), Arc::new(route)));
//! let backend = OpenAiBackend::builder("sk-...").build();
//!
//! let mut assistant = Assistant::new(backend, host);
//! let reply = assistant.chat("Route from Paris to Lyon by car").await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

mod assistant;
mod error;
pub mod model;
mod providers;
pub mod tools;

pub use assistant::{
    ApprovalHook, Assistant, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_SYSTEM_PROMPT, Reply,
};
pub use error::{Error, Result};
pub use model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    ToolSpec, Usage,
};
pub use providers::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiBackend, OpenAiBackendBuilder};
pub use tools::{MapToolHost, Timed, ToolError, ToolHost};
