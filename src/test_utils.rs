#[cfg(test)]
pub mod test_helpers {
    use crate::manager::{RestartConfig, ServerManager};
    use crate::process::{CommandProbe, LaunchConfig, ProbeConfig, ProcessController, TerminateConfig};
    use crate::store::ConfigStore;
    use serde_json::Value;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Isolated inventory and Claude config under a temp dir, plus a manager
    /// with timings short enough for tests.
    pub struct TestContext {
        manager: ServerManager,
        pub _temp_dir: TempDir,
    }

    impl TestContext {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let manager = ServerManager::new(
                store_in(temp_dir.path()),
                quick_controller(),
                quick_probe(),
            )
            .with_restart_config(RestartConfig {
                pause: Duration::from_millis(10),
            });

            Self {
                manager,
                _temp_dir: temp_dir,
            }
        }

        pub fn manager(&self) -> &ServerManager {
            &self.manager
        }

        pub fn store(&self) -> &ConfigStore {
            self.manager.store()
        }

        /// A manager over the same files but a different process controller.
        pub fn manager_with_controller(&self, controller: ProcessController) -> ServerManager {
            let controller = controller
                .with_terminate_config(quick_terminate())
                .with_launch_config(LaunchConfig {
                    settle: Duration::from_millis(10),
                });
            ServerManager::new(store_in(self.root()), controller, quick_probe()).with_restart_config(
                RestartConfig {
                    pause: Duration::from_millis(10),
                },
            )
        }

        pub fn write_claude_config(&self, value: Value) {
            let path = self.store().claude_config_path();
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        }

        pub fn root(&self) -> &Path {
            self._temp_dir.path()
        }
    }

    pub fn store_in(root: &Path) -> ConfigStore {
        ConfigStore::new(
            root.join("data").join("installed_servers.json"),
            root.join("claude").join("claude_desktop_config.json"),
        )
    }

    pub fn quick_probe() -> CommandProbe {
        CommandProbe::new(ProbeConfig {
            observation_window: Duration::from_millis(300),
            poll_interval: Duration::from_millis(20),
            stop_timeout: Duration::from_secs(1),
            kill_timeout: Duration::from_secs(1),
        })
    }

    pub fn quick_terminate() -> TerminateConfig {
        TerminateConfig {
            graceful_timeout: Duration::from_secs(2),
            kill_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(20),
        }
    }

    /// Never matches a real process and never launches anything real.
    pub fn quick_controller() -> ProcessController {
        ProcessController::new()
            .with_patterns(&["mcp-manager-test-no-such-process"])
            .with_terminate_config(quick_terminate())
            .with_launch_strategy(crate::process::LaunchStrategy::Unsupported {
                os: "test".to_string(),
            })
            .with_launch_config(LaunchConfig {
                settle: Duration::from_millis(10),
            })
    }
}
