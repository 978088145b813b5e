use crate::cli::OutputFormat;
use crate::dashboard::models::{parse_environment, split_words};
use crate::manager::ServerManager;
use crate::models::{NewServer, ServerEntry};
use anyhow::Result;

pub fn handle_list(manager: &ServerManager, format: OutputFormat) -> Result<()> {
    let servers = manager.list_servers();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&servers)?),
        OutputFormat::Text => {
            if servers.is_empty() {
                println!("No servers registered. Run 'mcp-manager discover' to import from Claude Desktop.");
                return Ok(());
            }
            for server in &servers {
                print_server(server);
            }
        },
    }

    Ok(())
}

pub async fn handle_set_enabled(
    manager: &ServerManager,
    identifier: &str,
    enabled: bool,
) -> Result<()> {
    let outcome = manager.set_enabled(identifier, enabled).await?;
    println!("{}", outcome.message);
    Ok(())
}

pub async fn handle_register(
    manager: &ServerManager,
    name: &str,
    command: &str,
    arguments: &str,
    env: &[String],
    format: OutputFormat,
) -> Result<()> {
    let new_server = NewServer {
        name: name.trim().to_string(),
        command: split_words(command),
        arguments: split_words(arguments),
        environment: parse_environment(&env.join("\n"))?,
        source_type: Some("cli".to_string()),
        source_location: Some("Registered via command line".to_string()),
    };

    let entry = manager.register_server(new_server).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry)?),
        OutputFormat::Text => {
            println!("Registered server '{}' (disabled)", entry.name);
            print_server(&entry);
            println!("\nEnable it with: mcp-manager enable {}", entry.id);
        },
    }

    Ok(())
}

fn print_server(server: &ServerEntry) {
    let badge = if server.enabled_in_claude { "●" } else { "○" };
    println!("{} {}  [{}]", badge, server.name, server.id);

    let mut invocation = server.command.clone();
    invocation.extend(server.arguments.iter().cloned());
    println!("    command: {}", invocation.join(" "));

    if !server.environment.is_empty() {
        let keys: Vec<&str> = server.environment.keys().map(String::as_str).collect();
        println!("    env: {}", keys.join(", "));
    }
    if let Some(source) = &server.source_type {
        println!("    source: {}", source);
    }
}
