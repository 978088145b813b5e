use clap::Parser;
use mcp_manager::cli::{Cli, Commands};
use mcp_manager::cli_handlers::{
    handle_discover, handle_doctor, handle_list, handle_mcp_server, handle_register,
    handle_restart, handle_serve, handle_set_enabled,
};
use mcp_manager::error::{ErrorResponse, ManagerError};
use mcp_manager::logging::{
    cleanup_old_logs, file_logging_requested, init_logging, log_dir, log_file_path,
    retention_days_from_env, ApplicationMode, LoggingConfig,
};
use mcp_manager::manager::ServerManager;
use std::io::IsTerminal;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mode = match cli.command {
        Commands::McpServer => ApplicationMode::McpServer,
        Commands::Serve { .. } => ApplicationMode::Dashboard,
        _ => ApplicationMode::Cli,
    };

    let mut log_config = LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json);
    if mode == ApplicationMode::McpServer {
        // stdout is the JSON-RPC channel; keep the quieter preset unless asked
        let level = log_config.level;
        log_config = LoggingConfig::for_mode(ApplicationMode::McpServer);
        if cli.verbose > 0 {
            log_config.level = level;
        }
    }

    // Claude Desktop runs the MCP server with stderr piped somewhere we never see
    let to_file = file_logging_requested()
        || (mode == ApplicationMode::McpServer && !std::io::stderr().is_terminal());
    if to_file {
        match log_file_path(mode) {
            Ok(path) => log_config.file_output = Some(path),
            Err(e) => eprintln!("Warning: file logging disabled: {}", e),
        }
    }

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if to_file {
        if let Ok(dir) = log_dir() {
            cleanup_old_logs(&dir, retention_days_from_env()).ok();
        }
    }

    if let Err(e) = run(&cli).await {
        let error_response = match e.downcast_ref::<ManagerError>() {
            Some(err) => err.to_error_response(),
            None => ErrorResponse {
                error: format!("{:#}", e),
                code: "INTERNAL_ERROR".to_string(),
            },
        };
        match serde_json::to_string_pretty(&error_response) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", error_response.error),
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let manager = ServerManager::from_env()?;
    tracing::debug!(command = cli.command.name(), "Dispatching command");

    match cli.command.clone() {
        Commands::Serve { port, browser } => handle_serve(manager, port, browser).await?,

        Commands::McpServer => handle_mcp_server(manager).await?,

        Commands::List { format } => handle_list(&manager, format)?,

        Commands::Enable { identifier } => handle_set_enabled(&manager, &identifier, true).await?,

        Commands::Disable { identifier } => {
            handle_set_enabled(&manager, &identifier, false).await?
        },

        Commands::Register {
            name,
            command,
            arguments,
            env,
            format,
        } => handle_register(&manager, &name, &command, &arguments, &env, format).await?,

        Commands::Restart => handle_restart(&manager).await?,

        Commands::Discover => handle_discover(&manager)?,

        Commands::Doctor => handle_doctor(&manager).await?,
    }

    Ok(())
}
