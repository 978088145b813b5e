//! Smoke test for a server command before it is registered.
//!
//! The command is started with its environment and watched briefly. A
//! process that exits inside the window is reported as broken; one that is
//! still running is considered good and is stopped again.

use crate::error::{ManagerError, Result};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Longest stderr excerpt carried in an error message.
const MAX_STDERR_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// How long the process must stay up to pass.
    pub observation_window: Duration,
    pub poll_interval: Duration,
    /// Wait after SIGTERM before escalating.
    pub stop_timeout: Duration,
    /// Wait after SIGKILL before giving up on the child.
    pub kill_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            observation_window: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(3),
            kill_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandProbe {
    config: ProbeConfig,
}

impl CommandProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Start `command` + `arguments` and check that it stays alive for the
    /// observation window. Blocks for at most the window plus teardown.
    pub fn probe(
        &self,
        command: &[String],
        arguments: &[String],
        environment: &BTreeMap<String, String>,
    ) -> Result<()> {
        let Some((executable, fixed_args)) = command.split_first() else {
            return Err(ManagerError::CommandInvalid("Command is empty".to_string()));
        };

        let resolved = which::which(executable).map_err(|_| {
            tracing::error!("Command not found in PATH: {}", executable);
            ManagerError::CommandInvalid(format!("Command not found in PATH: {}", executable))
        })?;

        tracing::info!(
            "Testing command: {} {}",
            executable,
            fixed_args
                .iter()
                .chain(arguments)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&resolved)
            .args(fixed_args)
            .args(arguments)
            .envs(environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(executable, e))?;

        let stderr = capture_stderr(&mut child);
        drain_stdout(&mut child);

        let deadline = Instant::now() + self.config.observation_window;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let output = stderr
                        .recv_timeout(Duration::from_millis(500))
                        .unwrap_or_default();
                    let code = status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "unknown (terminated by signal)".to_string());
                    tracing::error!("Command test failed: exited with code {}", code);
                    return Err(ManagerError::CommandInvalid(format!(
                        "Process exited quickly with code {}.\nOutput: {}",
                        code, output
                    )));
                },
                Ok(None) => {},
                Err(e) => {
                    self.stop(&mut child);
                    return Err(ManagerError::CommandInvalid(format!(
                        "Unexpected error testing command: {}",
                        e
                    )));
                },
            }

            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(self.config.poll_interval);
        }

        tracing::info!("Command test successful: process still running");
        self.stop(&mut child);
        Ok(())
    }

    /// Best-effort teardown; failures are logged only.
    fn stop(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Ok(raw) = i32::try_from(child.id()) {
                if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                    tracing::debug!("SIGTERM to probed process failed: {}", e);
                }
            }
            if wait_with_timeout(child, self.config.stop_timeout, self.config.poll_interval) {
                return;
            }
            tracing::warn!("Probed process ignored SIGTERM, killing it");
        }

        if let Err(e) = child.kill() {
            tracing::warn!("Error terminating test process: {}", e);
        }
        if !wait_with_timeout(child, self.config.kill_timeout, self.config.poll_interval) {
            tracing::warn!("Test process {} did not exit after kill", child.id());
        }
    }
}

fn spawn_error(executable: &str, e: io::Error) -> ManagerError {
    let message = match e.kind() {
        io::ErrorKind::NotFound => format!("Command not found: {}", executable),
        io::ErrorKind::PermissionDenied => {
            format!("Permission denied when running command: {}", executable)
        },
        _ => format!("OS error when running command: {}", e),
    };
    tracing::error!("{}", message);
    ManagerError::CommandInvalid(message)
}

/// Read stderr to EOF on a helper thread and hand the text back over a
/// channel so the caller can bound how long it waits.
fn capture_stderr(child: &mut Child) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::sync_channel(1);
    if let Some(mut pipe) = child.stderr.take() {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if buf.len() < MAX_STDERR_BYTES {
                            let room = MAX_STDERR_BYTES - buf.len();
                            buf.extend_from_slice(&chunk[..n.min(room)]);
                        }
                    },
                }
            }
            tx.send(String::from_utf8_lossy(&buf).trim().to_string()).ok();
        });
    }
    rx
}

/// Keep stdout flowing so a chatty child never blocks on a full pipe.
fn drain_stdout(child: &mut Child) {
    if let Some(mut pipe) = child.stdout.take() {
        std::thread::spawn(move || {
            io::copy(&mut pipe, &mut io::sink()).ok();
        });
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(poll),
            _ => return false,
        }
    }
}
