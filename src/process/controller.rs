//! Finding, stopping and starting Claude Desktop.

use super::handle::{ProcessHandle, SystemProcess};
use crate::error::{ManagerError, Result};
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Name fragments (lower-case) that identify Claude Desktop processes across
/// platforms and builds.
pub const CLAUDE_PROCESS_PATTERNS: &[&str] = &[
    "claude",
    "claudedesktop",
    "claude-desktop",
    "claude desktop",
    "anthropic claude",
    "anthropic-claude",
    "anthropic",
];

/// Bounds for stopping a process: SIGTERM, wait, SIGKILL, wait.
#[derive(Debug, Clone)]
pub struct TerminateConfig {
    pub graceful_timeout: Duration,
    pub kill_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for TerminateConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(5),
            kill_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Pause after spawning so the OS has registered the new process.
    pub settle: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
        }
    }
}

/// How Claude Desktop gets started on a given platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// macOS: `open -a <app>`
    OpenApp { app: String },
    /// Windows: first existing install path, else `cmd /C start "" <app>`
    InstallPaths {
        candidates: Vec<PathBuf>,
        fallback_app: String,
    },
    /// Linux: a command expected on `PATH`
    OnPath { command: String },
    Unsupported { os: String },
}

impl LaunchStrategy {
    pub fn for_current_platform() -> Self {
        Self::for_os(std::env::consts::OS, |key| std::env::var_os(key))
    }

    pub fn for_os(os: &str, env: impl Fn(&str) -> Option<std::ffi::OsString>) -> Self {
        match os {
            "macos" => LaunchStrategy::OpenApp {
                app: "Claude".to_string(),
            },
            "windows" => {
                let under = |key: &str, rest: &[&str]| {
                    let mut path = PathBuf::from(env(key).unwrap_or_default());
                    path.extend(rest);
                    path
                };
                LaunchStrategy::InstallPaths {
                    candidates: vec![
                        under("LOCALAPPDATA", &["AnthropicClaude", "claude.exe"]),
                        under("LOCALAPPDATA", &["Programs", "Claude", "Claude.exe"]),
                        under("PROGRAMFILES", &["Claude", "Claude.exe"]),
                        under("PROGRAMFILES(X86)", &["Claude", "Claude.exe"]),
                    ],
                    fallback_app: "Claude".to_string(),
                }
            },
            "linux" => LaunchStrategy::OnPath {
                command: "claude".to_string(),
            },
            other => LaunchStrategy::Unsupported {
                os: other.to_string(),
            },
        }
    }

    /// Build the command to spawn, or explain why there is none.
    fn command(&self) -> Result<Command> {
        match self {
            LaunchStrategy::OpenApp { app } => {
                tracing::info!("Using macOS open command to launch {}", app);
                let mut cmd = Command::new("open");
                cmd.args(["-a", app]);
                Ok(cmd)
            },
            LaunchStrategy::InstallPaths {
                candidates,
                fallback_app,
            } => match candidates.iter().find(|p| p.is_file()) {
                Some(path) => {
                    tracing::info!("Found Claude executable at {}", path.display());
                    Ok(Command::new(path))
                },
                None => {
                    tracing::info!("Using Windows start command to launch {}", fallback_app);
                    let mut cmd = Command::new("cmd");
                    cmd.args(["/C", "start", "", fallback_app]);
                    Ok(cmd)
                },
            },
            LaunchStrategy::OnPath { command } => {
                let resolved = which::which(command).map_err(|e| {
                    ManagerError::ProcessOpFailed(format!(
                        "Claude Desktop application not found: {}: {}",
                        command, e
                    ))
                })?;
                tracing::info!("Launching Claude using {}", resolved.display());
                Ok(Command::new(resolved))
            },
            LaunchStrategy::Unsupported { os } => {
                tracing::error!("Unsupported operating system: {}", os);
                Err(ManagerError::UnsupportedPlatform(os.clone()))
            },
        }
    }
}

/// Locates, stops and launches the Claude Desktop application.
///
/// All methods block; async callers run them on the blocking pool.
#[derive(Debug, Clone)]
pub struct ProcessController {
    patterns: Vec<String>,
    terminate: TerminateConfig,
    launch: LaunchStrategy,
    launch_config: LaunchConfig,
}

impl Default for ProcessController {
    fn default() -> Self {
        Self {
            patterns: CLAUDE_PROCESS_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            terminate: TerminateConfig::default(),
            launch: LaunchStrategy::for_current_platform(),
            launch_config: LaunchConfig::default(),
        }
    }
}

impl ProcessController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns = patterns.iter().map(|p| p.to_lowercase()).collect();
        self
    }

    pub fn with_terminate_config(mut self, config: TerminateConfig) -> Self {
        self.terminate = config;
        self
    }

    pub fn with_launch_strategy(mut self, strategy: LaunchStrategy) -> Self {
        self.launch = strategy;
        self
    }

    pub fn with_launch_config(mut self, config: LaunchConfig) -> Self {
        self.launch_config = config;
        self
    }

    /// Scan running processes for Claude Desktop.
    ///
    /// This process is never returned, nor are threads listed as tasks.
    pub fn find_target_processes(&self) -> Vec<Box<dyn ProcessHandle>> {
        use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

        tracing::info!("Searching for running Claude Desktop processes...");

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        let own_pid = std::process::id();
        let mut found: Vec<Box<dyn ProcessHandle>> = Vec::new();

        for (pid, process) in system.processes() {
            if pid.as_u32() == own_pid || process.thread_kind().is_some() {
                continue;
            }

            let name = process.name().to_string_lossy().into_owned();
            let exe = process
                .exe()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let cmdline = process
                .cmd()
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            if matches_any(&self.patterns, &name, &exe, &cmdline) {
                tracing::info!("Found Claude process: {} - {} - {}", pid, name, exe);
                found.push(Box::new(SystemProcess::new(pid.as_u32(), name)));
            }
        }

        if found.is_empty() {
            tracing::warn!("No Claude processes found");
        } else {
            tracing::info!("Found {} Claude processes", found.len());
        }

        found
    }

    /// Stop every handle, escalating from terminate to kill.
    ///
    /// Failures are collected; the call succeeds only if none occurred.
    pub fn terminate(&self, handles: &[Box<dyn ProcessHandle>]) -> Result<()> {
        if handles.is_empty() {
            tracing::info!("No processes to terminate");
            return Ok(());
        }

        tracing::info!("Attempting to terminate {} processes", handles.len());

        let errors: Vec<String> = handles
            .iter()
            .filter_map(|handle| self.terminate_one(handle.as_ref()).err())
            .collect();

        if errors.is_empty() {
            tracing::info!("All processes terminated successfully");
            Ok(())
        } else {
            let message = errors.join("\n");
            tracing::error!("Process termination had errors: {}", message);
            Err(ManagerError::ProcessOpFailed(message))
        }
    }

    fn terminate_one(&self, handle: &dyn ProcessHandle) -> std::result::Result<(), String> {
        let label = format!("{} (PID: {})", handle.name(), handle.pid());

        if !handle.is_alive() {
            tracing::info!("Process {} already terminated", label);
            return Ok(());
        }

        crate::log_process_operation!("terminate", handle.pid());
        match handle.terminate() {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("Process {} already terminated", label);
                return Ok(());
            },
            Err(e) => return Err(format!("Error terminating process {}: {}", label, e)),
        }

        if self.wait_for_exit(handle, self.terminate.graceful_timeout) {
            tracing::info!("Process {} terminated successfully", label);
            return Ok(());
        }

        tracing::warn!(
            "Process {} did not terminate gracefully, forcing kill",
            label
        );
        crate::log_process_operation!("force_kill", handle.pid());
        match handle.force_kill() {
            Ok(()) => {},
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(format!("Error killing process {}: {}", label, e)),
        }

        if self.wait_for_exit(handle, self.terminate.kill_timeout) {
            Ok(())
        } else {
            Err(format!("Failed to kill process {}", label))
        }
    }

    fn wait_for_exit(&self, handle: &dyn ProcessHandle, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !handle.is_alive() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(self.terminate.poll_interval);
        }
    }

    /// Start Claude Desktop without waiting for it to exit.
    pub fn launch(&self) -> Result<()> {
        tracing::info!("Attempting to start Claude Desktop application");

        let mut cmd = self.launch.command()?;
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ManagerError::ProcessOpFailed(format!(
                    "Claude Desktop application not found: {}",
                    e
                )),
                _ => ManagerError::ProcessOpFailed(format!("Error starting Claude Desktop: {}", e)),
            })?;

        tracing::info!("Claude Desktop launch initiated with PID {}", child.id());

        // Reap the launcher whenever it exits so it never lingers as a zombie
        std::thread::spawn(move || {
            child.wait().ok();
        });

        std::thread::sleep(self.launch_config.settle);
        Ok(())
    }
}

/// Case-insensitive substring match against name, executable path and
/// command line.
pub fn matches_any(patterns: &[String], name: &str, exe: &str, cmdline: &str) -> bool {
    let name = name.to_lowercase();
    let exe = exe.to_lowercase();
    let cmdline = cmdline.to_lowercase();

    patterns.iter().any(|pattern| {
        name.contains(pattern.as_str())
            || exe.contains(pattern.as_str())
            || cmdline.contains(pattern.as_str())
    })
}
