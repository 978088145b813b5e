//! Capability interface over an OS process found by a scan.

use std::io;

/// What the controller needs from a process in order to stop it.
///
/// `terminate` and `force_kill` report a process that is already gone as an
/// error of kind [`io::ErrorKind::NotFound`].
pub trait ProcessHandle: Send + Sync {
    fn pid(&self) -> u32;
    fn name(&self) -> String;
    /// Ask the process to exit (SIGTERM on Unix).
    fn terminate(&self) -> io::Result<()>;
    /// Kill the process outright (SIGKILL on Unix).
    fn force_kill(&self) -> io::Result<()>;
    fn is_alive(&self) -> bool;
}

/// A process on this machine, addressed by PID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProcess {
    pid: u32,
    name: String,
}

impl SystemProcess {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

impl ProcessHandle for SystemProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    #[cfg(unix)]
    fn terminate(&self) -> io::Result<()> {
        send_signal(self.pid, nix::sys::signal::Signal::SIGTERM)
    }

    #[cfg(windows)]
    fn terminate(&self) -> io::Result<()> {
        taskkill(self.pid, false)
    }

    #[cfg(unix)]
    fn force_kill(&self) -> io::Result<()> {
        send_signal(self.pid, nix::sys::signal::Signal::SIGKILL)
    }

    #[cfg(windows)]
    fn force_kill(&self) -> io::Result<()> {
        taskkill(self.pid, true)
    }

    fn is_alive(&self) -> bool {
        use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

        let pid = Pid::from_u32(self.pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        // Zombies have exited; they only wait for their parent to reap them
        system
            .process(pid)
            .map(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PID out of range"))?;

    match nix::sys::signal::kill(Pid::from_raw(raw), signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("process {} no longer exists", pid),
        )),
        Err(Errno::EPERM) => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("not permitted to signal process {}", pid),
        )),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(windows)]
fn taskkill(pid: u32, force: bool) -> io::Result<()> {
    use std::process::Command;

    let mut cmd = Command::new("taskkill");
    cmd.args(["/PID", &pid.to_string()]);
    if force {
        cmd.arg("/F");
    }

    let output = cmd.output()?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("not found") {
        return Err(io::Error::new(io::ErrorKind::NotFound, stderr.trim().to_string()));
    }
    Err(io::Error::other(format!(
        "taskkill failed for process {}: {}",
        pid,
        stderr.trim()
    )))
}
