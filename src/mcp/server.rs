//! MCP Manager MCP Server
//!
//! JSON-RPC 2.0 over stdin/stdout, one message per line. Lets an AI assistant
//! list the inventory, toggle servers, register new ones and restart Claude
//! Desktop. Logging must never touch stdout here.

use crate::dashboard::{daemon, server::DEFAULT_PORT};
use crate::error::ManagerError;
use crate::manager::ServerManager;
use crate::models::NewServer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// URI of the inventory resource
pub const INSTALLED_SERVERS_URI: &str = "mcpmanager://servers/installed";

const PROTOCOL_VERSION: &str = "2024-11-05";

// JSON-RPC 2.0 error codes
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct SetStatusArgs {
    server_id: Option<String>,
    server_name: Option<String>,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct RegisterArgs {
    name: String,
    command: Vec<String>,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    environment: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OpenWebUiArgs {
    port: Option<u16>,
    open_browser: Option<bool>,
}

/// Tool and resource schema
const MCP_SCHEMA: &str = include_str!("../../mcp-server.json");

/// Run discovery, then serve MCP on stdin/stdout until stdin closes.
pub async fn run(manager: ServerManager) -> io::Result<()> {
    match manager.discover() {
        Ok(report) if report.changed() => tracing::info!(
            "Discovery imported {} server(s) from Claude Desktop",
            report.imported.len()
        ),
        Ok(_) => {},
        Err(e) => {
            crate::log_error!(e, "startup discovery");
        },
    }

    tracing::info!("MCP server ready on stdio");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(&manager, stdin, tokio::io::stdout()).await
}

/// Message loop over any line-oriented reader and writer.
pub async fn serve<R, W>(manager: &ServerManager, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => {
                // Notifications carry no id and get no response
                if request.id.is_none() {
                    handle_notification(&request);
                    continue;
                }
                handle_request(manager, request).await
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e))),
            },
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

fn handle_notification(request: &JsonRpcRequest) {
    match request.method.as_str() {
        "initialized" | "notifications/initialized" => tracing::info!("MCP client initialized"),
        "notifications/cancelled" => tracing::warn!("Request cancelled by client"),
        other => tracing::debug!("Ignoring notification: {}", other),
    }
}

async fn handle_request(manager: &ServerManager, request: JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(JsonRpcError::new(
                INVALID_REQUEST,
                format!("Invalid JSON-RPC version: {}", request.jsonrpc),
            )),
        };
    }

    crate::log_mcp_operation!("request", request.method.as_str());

    let result = match request.method.as_str() {
        "initialize" => Ok(handle_initialize()),
        "ping" => Ok(json!({})),
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tool_call(manager, request.params).await,
        "resources/list" => handle_resources_list(),
        "resources/read" => handle_resource_read(manager, request.params),
        _ => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        )),
    };

    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    }
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false }
        },
        "serverInfo": {
            "name": "mcp-manager",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn schema() -> Result<Value, JsonRpcError> {
    serde_json::from_str(MCP_SCHEMA).map_err(|e| {
        JsonRpcError::new(
            INTERNAL_ERROR,
            format!("Failed to parse MCP tools schema: {}", e),
        )
    })
}

fn handle_tools_list() -> Result<Value, JsonRpcError> {
    let schema = schema()?;
    Ok(json!({ "tools": schema.get("tools").cloned().unwrap_or_else(|| json!([])) }))
}

fn handle_resources_list() -> Result<Value, JsonRpcError> {
    let schema = schema()?;
    Ok(json!({ "resources": schema.get("resources").cloned().unwrap_or_else(|| json!([])) }))
}

fn handle_resource_read(
    manager: &ServerManager,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let params: ReadResourceParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid resource parameters: {}", e)))?;

    if params.uri != INSTALLED_SERVERS_URI {
        tracing::error!("Unknown resource URI: {}", params.uri);
        return Err(JsonRpcError::new(
            INVALID_PARAMS,
            format!("Unknown resource URI: {}", params.uri),
        ));
    }

    let text = serde_json::to_string_pretty(&manager.list_servers())
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))?;

    Ok(json!({
        "contents": [{
            "uri": INSTALLED_SERVERS_URI,
            "mimeType": "application/json",
            "text": text
        }]
    }))
}

async fn handle_tool_call(
    manager: &ServerManager,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    let params: ToolCallParams = serde_json::from_value(params.unwrap_or(json!({})))
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid tool call parameters: {}", e)))?;

    tracing::info!("Calling tool: {}", params.name);

    let result = match params.name.as_str() {
        "restart_claude_desktop" => handle_restart_claude(manager).await,
        "set_server_enabled_status" => handle_set_enabled(manager, params.arguments).await,
        "register_server" => handle_register_server(manager, params.arguments).await,
        "open_web_ui" => handle_open_web_ui(params.arguments).await,
        _ => {
            return Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Unknown tool: {}", params.name),
            ))
        },
    };

    let (body, is_error) = match result {
        Ok(value) => (value, false),
        Err(e) => {
            tracing::error!("Tool {} failed: {}", params.name, e);
            (
                json!({
                    "status": "error",
                    "code": e.to_error_code(),
                    "message": e.to_string()
                }),
                true,
            )
        },
    };

    Ok(json!({
        "content": [{
            "type": "text",
            "text": serde_json::to_string_pretty(&body)
                .unwrap_or_else(|_| "{}".to_string())
        }],
        "isError": is_error
    }))
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, ManagerError> {
    // Tools without required arguments may be called with no arguments at all
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| ManagerError::InvalidInput(format!("Invalid arguments: {}", e)))
}

// Tool Handlers

async fn handle_restart_claude(manager: &ServerManager) -> Result<Value, ManagerError> {
    let outcome = manager.restart_claude().await?;

    Ok(json!({
        "status": "success",
        "action": outcome.action(),
        "message": outcome.message()
    }))
}

async fn handle_set_enabled(manager: &ServerManager, args: Value) -> Result<Value, ManagerError> {
    let args: SetStatusArgs = parse_args(args)?;

    let identifier = match (args.server_id, args.server_name) {
        (Some(id), None) => id,
        (None, Some(name)) => name,
        _ => {
            return Err(ManagerError::InvalidInput(
                "You must provide exactly one of 'server_id' or 'server_name'".to_string(),
            ))
        },
    };

    let outcome = manager.set_enabled(&identifier, args.enabled).await?;
    Ok(json!({
        "status": "success",
        "message": outcome.message,
        "server": outcome.server
    }))
}

async fn handle_register_server(
    manager: &ServerManager,
    args: Value,
) -> Result<Value, ManagerError> {
    let args: RegisterArgs = parse_args(args)?;

    let server = manager
        .register_server(NewServer {
            name: args.name,
            command: args.command,
            arguments: args.arguments,
            environment: args.environment,
            source_type: Some("mcp".to_string()),
            source_location: Some("Registered via MCP tool".to_string()),
        })
        .await?;

    Ok(json!({
        "status": "success",
        "message": format!(
            "Server '{}' registered. Enable it with set_server_enabled_status.",
            server.name
        ),
        "server": server
    }))
}

async fn handle_open_web_ui(args: Value) -> Result<Value, ManagerError> {
    let args: OpenWebUiArgs = parse_args(args)?;
    let port = args.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(ManagerError::InvalidInput("Port must be non-zero".to_string()));
    }

    let url = daemon::ensure_running(port)
        .await
        .map_err(|e| ManagerError::ProcessOpFailed(format!("{:#}", e)))?;

    if args.open_browser.unwrap_or(true) {
        if let Err(e) = daemon::open_browser(&url) {
            tracing::warn!("{:#}", e);
            return Ok(json!({
                "status": "success",
                "url": url,
                "message": format!("Web interface is running at {}, but the browser could not be opened.", url)
            }));
        }
    }

    Ok(json!({
        "status": "success",
        "url": url,
        "message": format!("Web interface is running at {}", url)
    }))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
