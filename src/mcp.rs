use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::model::SearchLogsParams;
use crate::search::SearchAdapter;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SEARCH_LOGS_TOOL: &str = "search-logs";

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    code: i32,
    message: String,
}

/// Tool outcome in the shape the MCP host expects: text content blocks, an
/// error flag, and the pagination cursor as a sibling of `content`.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ToolCallResult {
    pub fn text(text: String, next_cursor: Option<String>) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error: None,
            next_cursor,
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error: Some(true),
            next_cursor: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Serve MCP over stdio: one JSON-RPC request per line in, one response
/// per line out, strictly in order. The host owns any concurrency; this
/// loop handles a single call at a time.
pub async fn run_stdio(adapter: Arc<SearchAdapter>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let req: RpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                write_response(
                    &mut stdout,
                    rpc_error(Value::Null, -32700, format!("parse error: {e}")),
                )
                .await?;
                continue;
            }
        };

        // Notifications carry no id and get no response.
        if req.id.is_null() && req.method.starts_with("notifications/") {
            continue;
        }

        let resp = process_request(&adapter, req).await;
        write_response(&mut stdout, resp).await?;
    }

    Ok(())
}

/// Shared dispatch for every transport (stdio lines, HTTP `/message`).
pub async fn process_request(adapter: &SearchAdapter, req: RpcRequest) -> RpcResponse {
    match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        // Standard clients send this as a notification; acknowledge the
        // odd one that attaches an id.
        "notifications/initialized" => rpc_ok(req.id, Value::Bool(true)),
        "ping" => rpc_ok(req.id, json!({})),
        "tools/list" => rpc_ok(req.id, json!({ "tools": [search_logs_tool()] })),
        "tools/call" => handle_tool_call(adapter, req).await,
        _ => rpc_error(req.id, -32601, format!("method not found: {}", req.method)),
    }
}

fn handle_initialize(req: &RpcRequest) -> RpcResponse {
    rpc_ok(
        req.id.clone(),
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

async fn handle_tool_call(adapter: &SearchAdapter, req: RpcRequest) -> RpcResponse {
    let call: ToolCallParams = match serde_json::from_value(req.params.clone()) {
        Ok(c) => c,
        Err(e) => return rpc_error(req.id, -32602, format!("invalid params: {e}")),
    };

    let result = if call.name == SEARCH_LOGS_TOOL {
        call_search_logs(adapter, call.arguments).await
    } else {
        ToolCallResult::error(format!("unknown tool: {}", call.name))
    };

    rpc_ok(req.id, serde_json::to_value(result).unwrap_or(Value::Null))
}

/// Run one `search-logs` invocation. Per-call failures, from malformed
/// arguments to upstream rejections, come back as error-flagged tool
/// results; the RPC layer never sees them as faults.
pub async fn call_search_logs(adapter: &SearchAdapter, arguments: Value) -> ToolCallResult {
    let params: SearchLogsParams = match serde_json::from_value(arguments) {
        Ok(p) => p,
        Err(e) => return ToolCallResult::error(format!("invalid arguments: {e}")),
    };
    let request = match params.validate() {
        Ok(r) => r,
        Err(e) => return ToolCallResult::error(e.to_string()),
    };
    match adapter.execute(&request).await {
        Ok(result) => {
            let text =
                serde_json::to_string(&result.body).unwrap_or_else(|_| "null".to_string());
            ToolCallResult::text(text, result.next_cursor)
        }
        Err(e) => ToolCallResult::error(e.to_string()),
    }
}

fn search_logs_tool() -> Value {
    json!({
        "name": SEARCH_LOGS_TOOL,
        "description": "Search logs from Datadog.",
        "inputSchema": {
            "type": "object",
            "required": ["filterQuery"],
            "properties": {
                "filterQuery": {
                    "type": "string",
                    "description": "A query string to filter logs. For more information, see https://docs.datadoghq.com/logs/explorer/search_syntax/"
                },
                "filterFrom": {
                    "type": "string",
                    "format": "date-time",
                    "description": "The minimum timestamp for requested logs. Must be an ISO 8601 date-time string."
                },
                "filterTo": {
                    "type": "string",
                    "format": "date-time",
                    "description": "The maximum timestamp for requested logs. Must be an ISO 8601 date-time string."
                },
                "cursor": {
                    "type": "string",
                    "description": "The cursor to use for pagination, taken from the 'nextCursor' field of the previous response (or 'meta.page.after' inside its payload). Omit to start at the beginning of the log stream."
                }
            }
        }
    })
}

fn rpc_ok(id: Value, result: Value) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn rpc_error(id: Value, code: i32, message: String) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError { code, message }),
    }
}

async fn write_response(stdout: &mut tokio::io::Stdout, resp: RpcResponse) -> Result<()> {
    let line = serde_json::to_string(&resp).unwrap_or_else(|_| "{}".to_string());
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
