//! MCP Manager Logging System
//!
//! Structured logging via `tracing`. Console output always goes to stderr so
//! that stdout stays reserved for command results and JSON-RPC traffic.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Set to route logs to `<data dir>/logs/<mode>.log` instead of stderr.
pub const LOG_FILE_ENV: &str = "MCP_MANAGER_LOG_FILE";
pub const LOG_RETENTION_ENV: &str = "MCP_MANAGER_LOG_RETENTION_DAYS";
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to output
    pub level: Level,
    /// Enable colored output
    pub color: bool,
    pub show_timestamps: bool,
    /// Show target/module name
    pub show_target: bool,
    /// Enable JSON format for machine parsing
    pub json_format: bool,
    pub enable_spans: bool,
    /// Write to this file instead of stderr
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            color: true,
            show_timestamps: false,
            show_target: false,
            json_format: false,
            enable_spans: false,
            file_output: None,
        }
    }
}

impl LoggingConfig {
    /// Create config for different application modes
    pub fn for_mode(mode: ApplicationMode) -> Self {
        match mode {
            ApplicationMode::McpServer => Self {
                level: Level::INFO,
                color: false,
                show_timestamps: true,
                show_target: true,
                json_format: true,
                enable_spans: false, // Avoid noise next to JSON-RPC
                file_output: None,
            },
            ApplicationMode::Dashboard => Self {
                level: Level::INFO,
                color: false,
                show_timestamps: true,
                show_target: true,
                json_format: false,
                enable_spans: true,
                file_output: None,
            },
            ApplicationMode::Cli => Self::default(),
            ApplicationMode::Test => Self {
                level: Level::DEBUG,
                color: false,
                show_timestamps: true,
                show_target: true,
                json_format: false,
                enable_spans: true,
                file_output: None,
            },
        }
    }

    /// Create config from CLI arguments
    pub fn from_args(quiet: bool, verbose: bool, json: bool) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            Level::INFO
        };

        Self {
            level,
            color: !quiet && !json && io::stderr().is_terminal(),
            show_timestamps: verbose || json,
            show_target: verbose,
            json_format: json,
            enable_spans: verbose,
            file_output: None,
        }
    }
}

/// Application modes with different logging requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationMode {
    /// MCP stdio server: stdout carries JSON-RPC only
    McpServer,
    /// HTTP API and web UI
    Dashboard,
    Cli,
    Test,
}

impl ApplicationMode {
    fn log_file_name(self) -> &'static str {
        match self {
            ApplicationMode::McpServer => "mcp-server.log",
            ApplicationMode::Dashboard => "dashboard.log",
            ApplicationMode::Cli => "cli.log",
            ApplicationMode::Test => "test.log",
        }
    }
}

/// Directive used when `RUST_LOG` is unset.
pub fn default_directive(level: Level) -> String {
    format!("mcp_manager={}", level.as_str().to_lowercase())
}

/// Initialize the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LoggingConfig) -> io::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.level)));

    let registry = Registry::default().with(env_filter);

    let result = if let Some(log_file) = config.file_output {
        let dir = log_file
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid log file path"))?;
        let name = log_file
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid log file name"))?;
        std::fs::create_dir_all(dir)?;
        let file_appender = tracing_appender::rolling::never(dir, name);

        if config.json_format {
            fmt::layer()
                .json()
                .with_current_span(config.enable_spans)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .with_subscriber(registry)
                .try_init()
        } else if config.show_timestamps {
            fmt::layer()
                .with_target(config.show_target)
                .with_ansi(false)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_writer(file_appender)
                .with_subscriber(registry)
                .try_init()
        } else {
            fmt::layer()
                .with_target(config.show_target)
                .with_ansi(false)
                .with_writer(file_appender)
                .with_subscriber(registry)
                .try_init()
        }
    } else if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(config.enable_spans)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(io::stderr)
            .with_subscriber(registry)
            .try_init()
    } else if config.show_timestamps {
        fmt::layer()
            .with_target(config.show_target)
            .with_ansi(config.color)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_writer(io::stderr)
            .with_subscriber(registry)
            .try_init()
    } else {
        fmt::layer()
            .with_target(config.show_target)
            .with_ansi(config.color)
            .with_writer(io::stderr)
            .with_subscriber(registry)
            .try_init()
    };

    result.map_err(|e| io::Error::other(e.to_string()))
}

/// Whether file logging was requested through the environment.
pub fn file_logging_requested() -> bool {
    std::env::var_os(LOG_FILE_ENV).is_some_and(|v| !v.is_empty() && v != "0")
}

/// Directory holding log files.
pub fn log_dir() -> crate::error::Result<PathBuf> {
    Ok(crate::paths::data_dir()?.join("logs"))
}

/// Get log file path for a given application mode
pub fn log_file_path(mode: ApplicationMode) -> crate::error::Result<PathBuf> {
    Ok(log_dir()?.join(mode.log_file_name()))
}

/// Retention period from the environment, falling back to the default.
pub fn retention_days_from_env() -> u32 {
    std::env::var(LOG_RETENTION_ENV)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// Remove `*.log*` files in `log_dir` not modified within `retention_days`.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u32) -> io::Result<()> {
    use std::fs;
    use std::time::{Duration, SystemTime};

    if !log_dir.exists() {
        return Ok(());
    }

    let now = SystemTime::now();
    let retention = Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
    let mut cleaned_count = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path
            .file_name()
            .map(|n| n.to_string_lossy().contains(".log"))
            .unwrap_or(false);
        if !is_log || !path.is_file() {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if let Ok(age) = now.duration_since(modified) {
            if age > retention {
                match fs::remove_file(&path) {
                    Ok(_) => {
                        cleaned_count += 1;
                        tracing::info!(
                            "Cleaned up old log file: {} (age: {} days)",
                            path.display(),
                            age.as_secs() / 86400
                        );
                    },
                    Err(e) => {
                        tracing::warn!("Failed to remove old log file {}: {}", path.display(), e);
                    },
                }
            }
        }
    }

    if cleaned_count > 0 {
        tracing::info!("Log cleanup completed: removed {} files", cleaned_count);
    }

    Ok(())
}

/// Structured log line for inventory changes.
#[macro_export]
macro_rules! log_server_operation {
    ($operation:expr, $server:expr) => {
        tracing::info!(operation = $operation, server = $server, "Server operation");
    };
    ($operation:expr, $server:expr, $details:expr) => {
        tracing::info!(
            operation = $operation,
            server = $server,
            details = $details,
            "Server operation"
        );
    };
}

#[macro_export]
macro_rules! log_process_operation {
    ($operation:expr, $pid:expr) => {
        tracing::info!(operation = $operation, pid = $pid, "Process operation");
    };
}

#[macro_export]
macro_rules! log_mcp_operation {
    ($operation:expr, $method:expr) => {
        tracing::debug!(
            operation = $operation,
            mcp_method = $method,
            "MCP operation"
        );
    };
}

/// Utility macro for structured error logging
#[macro_export]
macro_rules! log_error {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Operation failed"
        );
    };
}
