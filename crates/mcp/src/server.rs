//! MCP server over newline-delimited JSON-RPC (stdio or any byte stream).

use maps::{ToolError, Toolbox};
use serde_json::{Value, json};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ServerInfo, Tool,
};

/// Maximum request line size (1MB).
pub const MAX_LINE_SIZE: usize = 1024 * 1024;

const INSTRUCTIONS: &str = "Map tools: geocoding, POI search, routing, isochrones and \
    distance matrices. Routing tools take [longitude, latitude] pairs.";

/// Serves a [`Toolbox`] to one MCP client.
pub struct Server {
    toolbox: Toolbox,
    info: ServerInfo,
}

impl Server {
    pub fn new(toolbox: Toolbox) -> Self {
        Self {
            toolbox,
            info: ServerInfo::default(),
        }
    }

    /// Serve on this process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Answer requests line by line until `reader` reaches EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = %self.info.name, "MCP server listening");
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes_read = (&mut reader)
                .take(MAX_LINE_SIZE as u64 + 1)
                .read_until(b'\n', &mut buf)
                .await?;
            if bytes_read == 0 {
                info!("client closed the stream");
                return Ok(());
            }

            let response = if buf.len() > MAX_LINE_SIZE {
                if buf.last() != Some(&b'\n') {
                    skip_line(&mut reader).await?;
                }
                warn!("request line too large");
                Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(
                        INVALID_REQUEST,
                        format!("request too large (max {MAX_LINE_SIZE} bytes)"),
                    ),
                ))
            } else {
                match std::str::from_utf8(&buf) {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => self.handle_line(line.trim()).await,
                    Err(e) => Some(JsonRpcResponse::failure(
                        None,
                        JsonRpcError::new(PARSE_ERROR, format!("parse error: {e}")),
                    )),
                }
            };

            if let Some(response) = response {
                let json = serde_json::to_string(&response)?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(PARSE_ERROR, format!("parse error: {e}")),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id,
                JsonRpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""),
            ));
        }

        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        let id = request.id.clone();
        let response = match self.dispatch(request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        };
        Some(response)
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> {
        debug!(method = %request.method, id = ?request.id, "request");
        match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = parse_params(request.params)?;
                if let Some(client) = &params.client_info {
                    info!(
                        client = %client.name,
                        version = client.version.as_deref().unwrap_or("?"),
                        protocol = params.protocol_version.as_deref().unwrap_or("?"),
                        "client connected"
                    );
                }
                to_value(InitializeResult {
                    protocol_version: PROTOCOL_VERSION,
                    capabilities: ServerCapabilities::default(),
                    server_info: self.info.clone(),
                    instructions: Some(INSTRUCTIONS.to_string()),
                })
            }
            "ping" => Ok(json!({})),
            "tools/list" => to_value(ListToolsResult {
                tools: self.toolbox.specs().into_iter().map(Tool::from).collect(),
            }),
            "tools/call" => {
                let params: CallToolParams = parse_params(request.params)?;
                self.call_tool(request.id, params).await
            }
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }

    async fn call_tool(
        &self,
        id: Option<RequestId>,
        params: CallToolParams,
    ) -> std::result::Result<Value, JsonRpcError> {
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match self.toolbox.call(&params.name, arguments).await {
            Ok(output) => CallToolResult::json(&output, false),
            Err(ToolError::UnknownTool(name)) => {
                return Err(JsonRpcError::new(
                    INVALID_PARAMS,
                    format!("unknown tool: {name}"),
                ));
            }
            Err(e) => {
                debug!(?id, tool = %params.name, kind = %e.kind(), "tool call failed");
                CallToolResult::json(&e.to_json(), true)
            }
        };
        to_value(result)
    }
}

/// Drop the rest of an oversized line, up to and including its newline.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let (found, used) = {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(());
            }
            match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, chunk.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

/// Absent params read as `{}`.
fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> std::result::Result<T, JsonRpcError> {
    let value = match params {
        None | Some(Value::Null) => json!({}),
        Some(value) => value,
    };
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {e}")))
}

fn to_value<T: serde::Serialize>(value: T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
}
