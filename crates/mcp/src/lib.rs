//! MCP (Model Context Protocol) server for the map tools.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout, so any MCP client
//! can call the six map operations. Logs must go to stderr; stdout carries
//! only protocol messages.
//!
//! # Example
//!
//! ```no_run
//! use maps::{GeoLookupServer, RouteServer, ServerParams, Toolbox};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let geo = GeoLookupServer::new(ServerParams::nominatim(), maps::DEFAULT_OVERPASS_URL)?;
//! let route = RouteServer::new(ServerParams::openrouteservice())?;
//! let toolbox = Toolbox::new(Arc::new(geo), Arc::new(route));
//!
//! mcp::Server::new(toolbox).serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ServerInfo, Tool, ToolContent,
};
pub use server::{MAX_LINE_SIZE, Server};
