//! Location of the two JSON documents the manager works with.
//!
//! The inventory lives in a per-user data directory; the Claude Desktop
//! configuration lives wherever Claude Desktop keeps it on each platform.

use crate::error::{ManagerError, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "MCPManager";
pub const INSTALLED_SERVERS_FILENAME: &str = "installed_servers.json";
pub const CLAUDE_CONFIG_FILENAME: &str = "claude_desktop_config.json";

/// Overrides the inventory directory.
pub const DATA_DIR_ENV: &str = "MCP_MANAGER_DATA_DIR";
/// Overrides the full path of the Claude Desktop configuration file.
pub const CLAUDE_CONFIG_ENV: &str = "MCP_MANAGER_CLAUDE_CONFIG";

/// Get the home directory
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| ManagerError::InvalidInput("Cannot determine home directory".to_string()))
}

/// Directory holding the inventory and the manager's logs.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or_else(|| {
            ManagerError::InvalidInput("Cannot determine user data directory".to_string())
        })
}

pub fn inventory_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(INSTALLED_SERVERS_FILENAME))
}

/// Path to `claude_desktop_config.json` for the running platform.
pub fn claude_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CLAUDE_CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    claude_config_path_for(env::consts::OS, &get_home_dir()?, env::var_os("APPDATA"))
}

/// Platform-specific resolution, split out so every branch can be tested
/// on any host.
pub fn claude_config_path_for(
    os: &str,
    home: &Path,
    appdata: Option<std::ffi::OsString>,
) -> Result<PathBuf> {
    match os {
        "macos" => Ok(home
            .join("Library")
            .join("Application Support")
            .join("Claude")
            .join(CLAUDE_CONFIG_FILENAME)),
        "windows" => {
            let appdata = appdata.filter(|v| !v.is_empty()).ok_or_else(|| {
                tracing::error!("APPDATA environment variable not set");
                ManagerError::InvalidInput("APPDATA environment variable not set".to_string())
            })?;
            Ok(PathBuf::from(appdata)
                .join("Claude")
                .join(CLAUDE_CONFIG_FILENAME))
        },
        "linux" => Ok(home
            .join(".config")
            .join("Claude")
            .join(CLAUDE_CONFIG_FILENAME)),
        other => {
            tracing::error!("Unsupported platform: {}", other);
            Err(ManagerError::UnsupportedPlatform(other.to_string()))
        },
    }
}
