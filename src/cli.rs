use clap::{Parser, Subcommand, ValueEnum};

use crate::dashboard::server::DEFAULT_PORT;

const LONG_ABOUT: &str = r#"
MCP Manager - keep a local inventory of MCP servers and Claude Desktop in sync

Servers live in an inventory file owned by this tool. Enabling a server
writes it into Claude Desktop's claude_desktop_config.json; disabling it
removes it again. Everything else in that file is left alone.

Typical workflow:
  mcp-manager discover            ← Import servers Claude Desktop already knows
  mcp-manager register ...        ← Test-start and add a new server
  mcp-manager enable <name|id>    ← Put it into Claude Desktop's config
  mcp-manager restart             ← Restart Claude Desktop to pick it up

Environment:
  MCP_MANAGER_DATA_DIR        Directory of installed_servers.json
  MCP_MANAGER_CLAUDE_CONFIG   Path of Claude Desktop's config file
  MCP_MANAGER_LOG_FILE        Set to 1 to log to <data dir>/logs
  RUST_LOG                    Log filter, e.g. mcp_manager=debug
"#;

#[derive(Parser, Clone)]
#[command(name = "mcp-manager")]
#[command(about = "Manage MCP servers registered with Claude Desktop")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the web interface and HTTP API in the foreground
    Serve {
        /// Port to listen on (127.0.0.1 only)
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Open the web interface in the default browser
        #[arg(long)]
        browser: bool,
    },

    /// Serve the MCP protocol on stdin/stdout
    ///
    /// This is the command Claude Desktop runs for the "mcp-manager" entry.
    #[command(name = "mcp-server")]
    McpServer,

    /// List registered servers
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Enable a server in Claude Desktop (by id or name)
    Enable {
        identifier: String,
    },

    /// Disable a server in Claude Desktop (by id or name)
    Disable {
        identifier: String,
    },

    /// Test-start a server command and add it to the inventory
    ///
    /// Examples:
    ///   mcp-manager register --name files \
    ///       --command "npx -y @modelcontextprotocol/server-filesystem" --args "/tmp"
    ///   mcp-manager register --name api --command "node server.js" --env API_KEY=abc
    Register {
        /// Unique server name
        #[arg(long)]
        name: String,

        /// Executable and fixed arguments, separated by spaces
        #[arg(long)]
        command: String,

        /// Extra arguments, separated by spaces
        #[arg(long = "args", default_value = "")]
        arguments: String,

        /// Environment variable as KEY=VALUE (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Restart Claude Desktop (or start it if it is not running)
    Restart,

    /// Import servers from Claude Desktop's config into the inventory
    Discover,

    /// Check paths, config files and running Claude Desktop processes
    Doctor,
}

impl Commands {
    /// Name used for log files and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Serve { .. } => "serve",
            Commands::McpServer => "mcp-server",
            Commands::List { .. } => "list",
            Commands::Enable { .. } => "enable",
            Commands::Disable { .. } => "disable",
            Commands::Register { .. } => "register",
            Commands::Restart => "restart",
            Commands::Discover => "discover",
            Commands::Doctor => "doctor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_register_parses_repeated_env() {
        let cli = Cli::parse_from([
            "mcp-manager",
            "register",
            "--name",
            "svc",
            "--command",
            "node app.js",
            "--env",
            "A=1",
            "--env",
            "B=2",
        ]);

        match cli.command {
            Commands::Register { name, env, arguments, .. } => {
                assert_eq!(name, "svc");
                assert_eq!(env, vec!["A=1", "B=2"]);
                assert!(arguments.is_empty());
            },
            _ => panic!("Expected register command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mcp-manager", "list", "-v", "--json"]);
        assert_eq!(cli.verbose, 1);
        assert!(cli.json);
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["mcp-manager", "serve"]);
        match cli.command {
            Commands::Serve { port, browser } => {
                assert_eq!(port, DEFAULT_PORT);
                assert!(!browser);
            },
            _ => panic!("Expected serve command"),
        }
    }
}
