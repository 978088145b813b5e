//! Integration tests for the MCP stdio server
//!
//! Each test starts `mcp-manager mcp-server` against an isolated inventory,
//! writes JSON-RPC lines to stdin and reads the responses from stdout.

mod common;

use common::{claude_config_path, inventory_path, isolated_std_command, read_json, write_json};
use serde_json::{json, Value};
use std::io::Write;
use std::process::Stdio;
use tempfile::TempDir;

/// Send every request, close stdin and collect one response per line
fn mcp_session(temp: &TempDir, requests: &[Value]) -> Vec<Value> {
    let mut child = isolated_std_command(temp)
        .arg("mcp-server")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let stdin = child.stdin.as_mut().unwrap();
    for request in requests {
        stdin.write_all(request.to_string().as_bytes()).unwrap();
        stdin.write_all(b"\n").unwrap();
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn request(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

#[test]
fn test_initialize_handshake() {
    let temp = TempDir::new().unwrap();
    let responses = mcp_session(
        &temp,
        &[
            request(
                1,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test", "version": "1.0"}
                }),
            ),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            request(2, "tools/list", json!({})),
        ],
    );

    // The notification gets no response
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "mcp-manager");
    assert!(responses[0]["result"]["capabilities"]["tools"].is_object());
    assert!(responses[0]["result"]["capabilities"]["resources"].is_object());

    let tools = responses[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 4);
    assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
}

#[test]
fn test_startup_discovery_feeds_installed_servers_resource() {
    let temp = TempDir::new().unwrap();
    write_json(
        &claude_config_path(&temp),
        &json!({"mcpServers": {"files": {"command": "npx", "args": ["server-filesystem"]}}}),
    );

    let responses = mcp_session(
        &temp,
        &[request(
            1,
            "resources/read",
            json!({"uri": "mcpmanager://servers/installed"}),
        )],
    );

    let text = responses[0]["result"]["contents"][0]["text"].as_str().unwrap();
    let servers: Value = serde_json::from_str(text).unwrap();
    let names: Vec<&str> = servers
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"files"));
    assert!(names.contains(&"mcp-manager"));
}

#[test]
fn test_set_server_enabled_status_tool() {
    let temp = TempDir::new().unwrap();
    write_json(
        &inventory_path(&temp),
        &json!([{"id": "id-1", "name": "files", "command": ["npx", "fs"], "enabled_in_claude": false}]),
    );

    let responses = mcp_session(
        &temp,
        &[request(
            1,
            "tools/call",
            json!({
                "name": "set_server_enabled_status",
                "arguments": {"server_id": "id-1", "enabled": true}
            }),
        )],
    );

    let result = &responses[0]["result"];
    assert_eq!(result["isError"], false);
    let body: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(body["status"], "success");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Server 'files' enabled."));

    let config = read_json(&claude_config_path(&temp));
    assert_eq!(
        config["mcpServers"]["files"],
        json!({"command": "npx", "args": ["fs"]})
    );
}

#[test]
fn test_invalid_json_then_valid_request() {
    let temp = TempDir::new().unwrap();
    let mut child = isolated_std_command(&temp)
        .arg("mcp-server")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let stdin = child.stdin.as_mut().unwrap();
    stdin.write_all(b"this is not json\n").unwrap();
    stdin
        .write_all(format!("{}\n", request(5, "ping", Value::Null)).as_bytes())
        .unwrap();
    drop(child.stdin.take());

    let output = child.wait_with_output().unwrap();
    let responses: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 5);
    assert_eq!(responses[1]["result"], json!({}));
}
