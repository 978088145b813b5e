use crate::dashboard::{daemon, server::DEFAULT_PORT};
use crate::manager::ServerManager;
use crate::models::ServerEntry;
use crate::reconcile::MCP_SERVERS_KEY;
use anyhow::Result;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

pub async fn handle_restart(manager: &ServerManager) -> Result<()> {
    let outcome = manager.restart_claude().await?;
    println!("{}", outcome.message());
    Ok(())
}

pub fn handle_discover(manager: &ServerManager) -> Result<()> {
    let report = manager.discover()?;

    println!(
        "Imported {} server(s) from Claude Desktop",
        report.imported.len()
    );
    for name in &report.imported {
        println!("  + {}", name);
    }
    if report.self_registered {
        println!("Registered mcp-manager itself (disabled)");
    }

    Ok(())
}

pub async fn handle_doctor(manager: &ServerManager) -> Result<()> {
    let store = manager.store();

    let mut checks = vec![json!({
        "check": "Path Resolution",
        "status": "✓ INFO",
        "details": {
            "inventory": store.inventory_path().display().to_string(),
            "claude_config": store.claude_config_path().display().to_string(),
        }
    })];

    checks.push(check_inventory(store.inventory_path()));
    checks.push(check_claude_config(store.claude_config_path()));

    match manager.count_claude_processes().await {
        Ok(count) => checks.push(json!({
            "check": "Claude Desktop Processes",
            "status": "✓ INFO",
            "details": {
                "running": count,
                "message": format!("{} Claude Desktop process(es) running", count)
            }
        })),
        Err(e) => checks.push(json!({
            "check": "Claude Desktop Processes",
            "status": "⚠ WARNING",
            "details": {"error": e.to_string()}
        })),
    }

    let web_running = daemon::check_health(DEFAULT_PORT).await;
    checks.push(json!({
        "check": "Web Interface",
        "status": "✓ INFO",
        "details": {
            "running": web_running,
            "url": daemon::base_url(DEFAULT_PORT),
        }
    }));

    let has_failures = checks
        .iter()
        .any(|c| c["status"].as_str().unwrap_or("").contains("✗ FAIL"));
    let has_warnings = checks
        .iter()
        .any(|c| c["status"].as_str().unwrap_or("").contains("⚠ WARNING"));

    let summary = if has_failures {
        "✗ Critical issues detected"
    } else if has_warnings {
        "⚠ Some files need attention"
    } else {
        "✓ All systems operational"
    };

    let result = json!({
        "summary": summary,
        "checked_at": chrono::Utc::now().to_rfc3339(),
        "overall_status": if has_failures { "unhealthy" }
                         else if has_warnings { "warnings" }
                         else { "healthy" },
        "checks": checks
    });

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn check_inventory(path: &Path) -> Value {
    const CHECK: &str = "Server Inventory";

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return json!({
                "check": CHECK,
                "status": "⚠ WARNING",
                "details": {"message": "Inventory file does not exist yet"}
            });
        },
        Err(e) => {
            return json!({
                "check": CHECK,
                "status": "✗ FAIL",
                "details": {"error": format!("Failed to read: {}", e)}
            });
        },
    };

    match serde_json::from_str::<Vec<ServerEntry>>(&content) {
        Ok(servers) => {
            let enabled = servers.iter().filter(|s| s.enabled_in_claude).count();
            json!({
                "check": CHECK,
                "status": "✓ PASS",
                "details": {"servers": servers.len(), "enabled": enabled}
            })
        },
        Err(e) => json!({
            "check": CHECK,
            "status": "✗ FAIL",
            "details": {"error": format!("Invalid JSON: {}", e)}
        }),
    }
}

fn check_claude_config(path: &Path) -> Value {
    const CHECK: &str = "Claude Desktop Config";

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return json!({
                "check": CHECK,
                "status": "⚠ WARNING",
                "details": {"message": "Config file does not exist; it is created on first enable"}
            });
        },
        Err(e) => {
            return json!({
                "check": CHECK,
                "status": "✗ FAIL",
                "details": {"error": format!("Failed to read: {}", e)}
            });
        },
    };

    match serde_json::from_str::<Map<String, Value>>(&content) {
        Ok(config) => {
            let servers = config
                .get(MCP_SERVERS_KEY)
                .and_then(Value::as_object)
                .map_or(0, Map::len);
            json!({
                "check": CHECK,
                "status": "✓ PASS",
                "details": {"mcp_servers": servers}
            })
        },
        Err(e) => json!({
            "check": CHECK,
            "status": "✗ FAIL",
            "details": {"error": format!("Invalid JSON: {}", e)}
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_inventory_missing_is_warning() {
        let temp = TempDir::new().unwrap();
        let check = check_inventory(&temp.path().join("installed_servers.json"));
        assert_eq!(check["status"], "⚠ WARNING");
    }

    #[test]
    fn test_check_inventory_counts_enabled() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("installed_servers.json");
        fs::write(
            &path,
            r#"[{"id":"a","name":"one","command":["x"],"enabled_in_claude":true},
               {"id":"b","name":"two","command":["y"]}]"#,
        )
        .unwrap();

        let check = check_inventory(&path);
        assert_eq!(check["status"], "✓ PASS");
        assert_eq!(check["details"]["servers"], 2);
        assert_eq!(check["details"]["enabled"], 1);
    }

    #[test]
    fn test_check_claude_config_rejects_non_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("claude_desktop_config.json");
        fs::write(&path, "[1, 2]").unwrap();

        assert_eq!(check_claude_config(&path)["status"], "✗ FAIL");
    }

    #[test]
    fn test_check_claude_config_counts_servers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("claude_desktop_config.json");
        fs::write(
            &path,
            r#"{"theme":"dark","mcpServers":{"a":{"command":"x"},"b":{"command":"y"}}}"#,
        )
        .unwrap();

        let check = check_claude_config(&path);
        assert_eq!(check["status"], "✓ PASS");
        assert_eq!(check["details"]["mcp_servers"], 2);
    }
}
