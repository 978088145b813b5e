//! Helpers for running the web interface in the background.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

/// How long `ensure_running` waits for a freshly spawned server.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Get PID file path for a web interface instance
pub fn pid_file_path(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("mcp-manager-{}.pid", port))
}

/// Write PID to file
pub fn write_pid_file(port: u16, pid: u32) -> Result<()> {
    let path = pid_file_path(port);
    fs::write(&path, pid.to_string())
        .with_context(|| format!("Failed to write PID file: {}", path.display()))?;
    Ok(())
}

/// Read PID from file
pub fn read_pid_file(port: u16) -> Result<Option<u32>> {
    let path = pid_file_path(port);

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read PID file: {}", path.display()))?;

    let pid = content
        .trim()
        .parse::<u32>()
        .context("Invalid PID in file")?;

    Ok(Some(pid))
}

/// Delete PID file
pub fn delete_pid_file(port: u16) -> Result<()> {
    let path = pid_file_path(port);

    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete PID file: {}", path.display()))?;
    }

    Ok(())
}

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

/// Open URL in default browser
pub fn open_browser(url: &str) -> Result<()> {
    open::that(url).with_context(|| format!("Failed to open browser at {}", url))
}

/// Whether a web interface answers on `port`
pub async fn check_health(port: u16) -> bool {
    let health_url = format!("{}/api/health", base_url(port));

    match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => match client.get(&health_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body: serde_json::Value = resp.json().await.unwrap_or_default();
                let ours = is_own_health_response(&body, port);
                if ours {
                    tracing::debug!("Web interface health check passed for port {}", port);
                } else {
                    tracing::debug!("Port {} answers, but not as mcp-manager: {}", port, body);
                }
                ours
            },
            Ok(resp) => {
                tracing::debug!("Web interface health check failed: status {}", resp.status());
                false
            },
            Err(e) => {
                tracing::debug!("Web interface health check failed: {}", e);
                false
            },
        },
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {}", e);
            false
        },
    }
}

/// Whether a `/api/health` body comes from an mcp-manager serving `port`.
fn is_own_health_response(body: &serde_json::Value, port: u16) -> bool {
    body["service"] == "mcp-manager" && body["port"] == u64::from(port)
}

/// Start `<this exe> serve --port N` detached unless a server already
/// answers, then wait for it to become healthy. Returns the base URL.
pub async fn ensure_running(port: u16) -> Result<String> {
    let url = base_url(port);

    if check_health(port).await {
        tracing::info!("Web interface already running at {}", url);
        return Ok(url);
    }

    let current_exe = std::env::current_exe().context("Failed to locate current executable")?;
    let mut cmd = Command::new(current_exe);
    cmd.args(["serve", "--port", &port.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so signals aimed at the MCP server do not reach it
        cmd.process_group(0);
    }

    let child = cmd.spawn().context("Failed to start web interface")?;
    tracing::info!("Started web interface with PID {}", child.id());

    let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(250)).await;
        if check_health(port).await {
            return Ok(url);
        }
    }

    anyhow::bail!(
        "Web interface did not become healthy on port {} within {} seconds",
        port,
        STARTUP_TIMEOUT.as_secs()
    )
}
