use crate::dashboard::daemon;
use crate::dashboard::server::DashboardServer;
use crate::manager::ServerManager;
use anyhow::{Context, Result};

/// Run the web interface in the foreground until the process is stopped.
pub async fn handle_serve(manager: ServerManager, port: u16, browser: bool) -> Result<()> {
    if let Ok(Some(existing_pid)) = daemon::read_pid_file(port) {
        if daemon::check_health(port).await {
            println!("Web interface already running:");
            println!("  PID: {}", existing_pid);
            println!("  URL: {}", daemon::base_url(port));
            return Ok(());
        }
        tracing::info!("Cleaning up stale PID file for port {}", port);
        daemon::delete_pid_file(port).ok();
    }

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

    let url = daemon::base_url(port);
    eprintln!("MCP Manager web interface running at {}", url);
    eprintln!("Press Ctrl+C to stop");

    daemon::write_pid_file(port, std::process::id())?;

    if browser {
        let url = url.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(800)).await;
            if let Err(e) = daemon::open_browser(&url) {
                tracing::warn!("Could not open browser automatically: {:#}", e);
            }
        });
    }

    let result = DashboardServer::new(port, manager).run().await;
    daemon::delete_pid_file(port).ok();

    result.with_context(|| format!("Web interface on port {} stopped", port))
}

pub async fn handle_mcp_server(manager: ServerManager) -> Result<()> {
    crate::mcp::run(manager)
        .await
        .context("MCP server failed")
}
