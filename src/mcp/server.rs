//! Stdio tool server exposing the batch revenue lookup

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::protocol::*;
use crate::data::RevenueSource;
use crate::lookup::RevenueLookup;

/// Name under which the lookup is advertised
pub const FETCH_REVENUE_TOOL: &str = "fetch-app-revenue";

/// Errors raised while serving a request
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error on stdio transport: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),
}

impl ServerError {
    /// JSON-RPC error code reported to the client
    pub fn code(&self) -> i32 {
        match self {
            ServerError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            ServerError::UnknownTool(_) | ServerError::InvalidParams(_) => {
                error_codes::INVALID_PARAMS
            }
            ServerError::Io(_) | ServerError::Json(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

/// Arguments of the `fetch-app-revenue` tool
#[derive(Debug, Deserialize)]
struct FetchRevenueArgs {
    app_ids: Vec<String>,
}

/// Serves newline-delimited JSON-RPC requests
pub struct RevenueServer<S> {
    lookup: RevenueLookup<S>,
}

impl<S: RevenueSource> RevenueServer<S> {
    pub fn new(lookup: RevenueLookup<S>) -> Self {
        Self { lookup }
    }

    /// Serves stdin/stdout until stdin closes
    pub async fn run_stdio(&self) -> Result<(), ServerError> {
        info!("Revenue server started (stdio mode)");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Reads one request per line from `reader` and writes responses to `writer`
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            if let Some(response) = self.handle_line(&line).await {
                let response_json = serde_json::to_string(&response)?;
                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                debug!("Sent: {}", response_json);
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handles one raw message; notifications produce no response
    pub async fn handle_line(&self, line: &str) -> Option<McpResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(McpResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        };

        let id = value.get("id").cloned();
        let request: McpRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(McpResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ))
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let response = match self.dispatch(&request).await {
            Ok(result) => McpResponse::success(request.id, result),
            Err(e) => {
                warn!(method = %request.method, error = %e, "Request failed");
                McpResponse::error(request.id, e.code(), e.to_string())
            }
        };
        Some(response)
    }

    async fn dispatch(&self, request: &McpRequest) -> Result<Value, ServerError> {
        debug!(method = %request.method, "Handling method");

        match request.method.as_str() {
            "initialize" => Ok(serde_json::to_value(initialize_result())?),
            "tools/list" => Ok(json!({ "tools": [fetch_revenue_tool()] })),
            "tools/call" => self.call_tool(&request.params).await,
            "ping" => Ok(json!({})),
            other => Err(ServerError::MethodNotFound(other.to_string())),
        }
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, ServerError> {
        let params: ToolCallParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidParams(e.to_string()))?;

        if params.name != FETCH_REVENUE_TOOL {
            return Err(ServerError::UnknownTool(params.name));
        }

        let args: FetchRevenueArgs = serde_json::from_value(params.arguments)
            .map_err(|e| ServerError::InvalidParams(e.to_string()))?;

        let report = self.lookup.lookup(&args.app_ids).await;
        let text = serde_json::to_string_pretty(&report)?;

        Ok(serde_json::to_value(ToolCallResult::text(text))?)
    }
}

fn initialize_result() -> InitializeResult {
    InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: ServerInfo {
            name: "appstore-revenue".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

fn fetch_revenue_tool() -> Tool {
    Tool {
        name: FETCH_REVENUE_TOOL.to_string(),
        title: "Fetch Apple App Store Revenue".to_string(),
        description: "Fetch revenue data for Apple App Store apps using Sensor Tower API. \
                      Returns last month's revenue and download estimates. Data is cached for 30 days."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "app_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Array of iOS app IDs to fetch revenue data for"
                }
            },
            "required": ["app_ids"]
        }),
    }
}
