//! Read-modify-write flows shared by the HTTP API, the MCP server and the CLI.
//!
//! Nothing is cached between calls: every operation starts from what is on
//! disk. Blocking process work runs on tokio's blocking pool.

use crate::error::{ManagerError, Result};
use crate::models::{NewServer, ServerEntry};
use crate::process::{CommandProbe, ProcessController};
use crate::reconcile::{self, DiscoveryReport};
use crate::registry;
use crate::store::ConfigStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RestartConfig {
    /// Pause between stopping Claude Desktop and starting it again.
    pub pause: Duration,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_secs(1),
        }
    }
}

/// Result of toggling a server.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub server: ServerEntry,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RestartOutcome {
    /// Nothing was running; Claude Desktop was only launched.
    Started,
    /// `terminated` processes were stopped before launching.
    Restarted { terminated: usize },
}

impl RestartOutcome {
    /// `"started"` or `"restarted"`, as reported by the HTTP and MCP surfaces.
    pub fn action(&self) -> &'static str {
        match self {
            RestartOutcome::Started => "started",
            RestartOutcome::Restarted { .. } => "restarted",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RestartOutcome::Started => "Claude Desktop started successfully.",
            RestartOutcome::Restarted { .. } => "Claude Desktop restarted successfully.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerManager {
    store: Arc<ConfigStore>,
    controller: Arc<ProcessController>,
    probe: Arc<CommandProbe>,
    restart: RestartConfig,
}

impl ServerManager {
    pub fn new(store: ConfigStore, controller: ProcessController, probe: CommandProbe) -> Self {
        Self {
            store: Arc::new(store),
            controller: Arc::new(controller),
            probe: Arc::new(probe),
            restart: RestartConfig::default(),
        }
    }

    /// Manager over the documents at their default locations.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            ConfigStore::from_env()?,
            ProcessController::new(),
            CommandProbe::default(),
        ))
    }

    pub fn with_restart_config(mut self, config: RestartConfig) -> Self {
        self.restart = config;
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn list_servers(&self) -> Vec<ServerEntry> {
        self.store.read_inventory()
    }

    /// Flip `enabled_in_claude` for the server matching `identifier` and
    /// project the change into Claude's config.
    ///
    /// The inventory is written first. If the Claude config write then
    /// fails, the inventory change stays and the error is returned; the next
    /// toggle or discovery pass brings the two back in line.
    pub async fn set_enabled(&self, identifier: &str, enabled: bool) -> Result<ToggleOutcome> {
        let mut servers = self.store.read_inventory();
        let index = registry::find_by_identifier(&servers, identifier).into_result(identifier)?;

        let server = &mut servers[index];
        server.enabled_in_claude = enabled;
        let server = server.clone();
        let spec = reconcile::project_to_external(&server)?;

        self.store.write_inventory(&servers)?;

        let mut config = self.store.read_claude_config();
        reconcile::apply_to_external_config(&mut config, &server.name, spec.as_ref())?;
        self.store.write_claude_config(&config)?;

        let action = if enabled { "enabled" } else { "disabled" };
        crate::log_server_operation!(action, server.name.as_str(), server.id.as_str());

        Ok(ToggleOutcome {
            message: format!(
                "Server '{}' {}. Remember to restart Claude Desktop for changes to take effect.",
                server.name, action
            ),
            server,
        })
    }

    /// Validate, probe and persist a new server. It starts out disabled.
    pub async fn register_server(&self, new_server: NewServer) -> Result<ServerEntry> {
        registry::validate(&new_server)?;
        registry::ensure_unique_name(&self.store.read_inventory(), &new_server.name)?;

        let probe = Arc::clone(&self.probe);
        let command = new_server.command.clone();
        let arguments = new_server.arguments.clone();
        let environment = new_server.environment.clone();
        run_blocking(move || probe.probe(&command, &arguments, &environment)).await??;

        // Re-read: the inventory may have changed while the probe ran
        let mut servers = self.store.read_inventory();
        let entry = registry::register(&mut servers, new_server)?;
        self.store.write_inventory(&servers)?;
        Ok(entry)
    }

    /// Stop any running Claude Desktop processes, then start it again.
    pub async fn restart_claude(&self) -> Result<RestartOutcome> {
        let controller = Arc::clone(&self.controller);
        let terminated = run_blocking(move || {
            let targets = controller.find_target_processes();
            controller.terminate(&targets).map(|()| targets.len())
        })
        .await??;

        if terminated > 0 {
            tokio::time::sleep(self.restart.pause).await;
        }

        let controller = Arc::clone(&self.controller);
        run_blocking(move || controller.launch()).await??;

        let outcome = if terminated == 0 {
            RestartOutcome::Started
        } else {
            RestartOutcome::Restarted { terminated }
        };
        tracing::info!("{}", outcome.message());
        Ok(outcome)
    }

    /// Number of Claude Desktop processes currently running.
    pub async fn count_claude_processes(&self) -> Result<usize> {
        let controller = Arc::clone(&self.controller);
        run_blocking(move || controller.find_target_processes().len()).await
    }

    /// Import Claude-only servers and make sure the self-entry exists.
    /// The inventory is written only when something was added.
    pub fn discover(&self) -> Result<DiscoveryReport> {
        let mut servers = self.store.read_inventory();
        let config = self.store.read_claude_config();

        let report =
            reconcile::discover_from_external(&mut servers, &config, &reconcile::self_command());

        if report.changed() {
            self.store.write_inventory(&servers)?;
        }
        tracing::info!(
            imported = report.imported.len(),
            self_registered = report.self_registered,
            "Discovery completed"
        );
        Ok(report)
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ManagerError::ProcessOpFailed(format!("Worker task failed: {}", e)))
}
