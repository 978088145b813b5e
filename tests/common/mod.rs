//! Common utilities for integration tests
//!
//! Every command runs against files inside a temp dir, selected through
//! `MCP_MANAGER_DATA_DIR` and `MCP_MANAGER_CLAUDE_CONFIG`.

#![allow(dead_code)] // Not every test file uses every helper

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to the `mcp-manager` binary built by cargo
#[allow(deprecated)] // cargo_bin() is deprecated but needed for fallback
pub fn mcp_manager_binary() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_mcp-manager")
        .map(PathBuf::from)
        .unwrap_or_else(|_| assert_cmd::cargo::cargo_bin("mcp-manager"))
}

pub fn data_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("data")
}

pub fn inventory_path(temp: &TempDir) -> PathBuf {
    data_dir(temp).join("installed_servers.json")
}

pub fn claude_config_path(temp: &TempDir) -> PathBuf {
    temp.path().join("claude").join("claude_desktop_config.json")
}

/// `mcp-manager` isolated to the files under `temp`
pub fn isolated_command(temp: &TempDir) -> Command {
    let mut cmd = Command::new(mcp_manager_binary());
    cmd.env("MCP_MANAGER_DATA_DIR", data_dir(temp))
        .env("MCP_MANAGER_CLAUDE_CONFIG", claude_config_path(temp))
        .env_remove("MCP_MANAGER_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Same isolation for a plain `std::process::Command`
pub fn isolated_std_command(temp: &TempDir) -> std::process::Command {
    let mut cmd = std::process::Command::new(mcp_manager_binary());
    cmd.env("MCP_MANAGER_DATA_DIR", data_dir(temp))
        .env("MCP_MANAGER_CLAUDE_CONFIG", claude_config_path(temp))
        .env_remove("MCP_MANAGER_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
