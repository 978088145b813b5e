//! Read/write access to the inventory and to Claude Desktop's configuration.
//!
//! Reads never fail: a missing, empty or malformed document is logged and
//! treated as empty. Writes replace the whole document and report failures.

use crate::error::{ManagerError, Result};
use crate::models::ServerEntry;
use crate::paths;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Both persisted documents, each guarded by its own write lock.
#[derive(Debug)]
pub struct ConfigStore {
    inventory_path: PathBuf,
    claude_config_path: PathBuf,
    inventory_lock: Mutex<()>,
    claude_config_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(inventory_path: impl Into<PathBuf>, claude_config_path: impl Into<PathBuf>) -> Self {
        Self {
            inventory_path: inventory_path.into(),
            claude_config_path: claude_config_path.into(),
            inventory_lock: Mutex::new(()),
            claude_config_lock: Mutex::new(()),
        }
    }

    /// Resolve both paths from the environment and platform conventions.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(paths::inventory_path()?, paths::claude_config_path()?))
    }

    pub fn inventory_path(&self) -> &Path {
        &self.inventory_path
    }

    pub fn claude_config_path(&self) -> &Path {
        &self.claude_config_path
    }

    /// Records are decoded one by one. A record that does not decode is
    /// skipped, and the file is copied to `<name>.bak` before the next write
    /// can drop it.
    pub fn read_inventory(&self) -> Vec<ServerEntry> {
        let records = match read_document::<Value>(&self.inventory_path, "servers") {
            Some(Value::Array(records)) => records,
            Some(other) => {
                tracing::error!(
                    path = %self.inventory_path.display(),
                    "Server inventory is not a JSON array (found {}), ignoring it",
                    json_kind(&other)
                );
                return Vec::new();
            },
            None => return Vec::new(),
        };

        let total = records.len();
        let servers: Vec<ServerEntry> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(server) => Some(server),
                Err(e) => {
                    tracing::error!(
                        index,
                        path = %self.inventory_path.display(),
                        "Skipping unreadable server record: {}",
                        e
                    );
                    None
                },
            })
            .collect();

        if servers.len() < total {
            self.backup_inventory();
        }
        tracing::debug!(
            count = servers.len(),
            path = %self.inventory_path.display(),
            "Read server inventory"
        );
        servers
    }

    pub fn write_inventory(&self, servers: &[ServerEntry]) -> Result<()> {
        let _guard = self
            .inventory_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        write_document(&self.inventory_path, servers)?;
        tracing::info!(
            count = servers.len(),
            path = %self.inventory_path.display(),
            "Wrote server inventory"
        );
        Ok(())
    }

    pub fn inventory_backup_path(&self) -> PathBuf {
        let mut name = self
            .inventory_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".bak");
        self.inventory_path.with_file_name(name)
    }

    fn backup_inventory(&self) {
        let backup = self.inventory_backup_path();
        if backup.exists() {
            return;
        }
        match fs::copy(&self.inventory_path, &backup) {
            Ok(_) => tracing::warn!("Saved original inventory to {}", backup.display()),
            Err(e) => tracing::error!("Failed to back up inventory to {}: {}", backup.display(), e),
        }
    }

    /// Claude Desktop's configuration as a JSON object. Anything that is not
    /// an object degrades to an empty one.
    pub fn read_claude_config(&self) -> Map<String, Value> {
        match read_document::<Value>(&self.claude_config_path, "Claude config") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                tracing::error!(
                    path = %self.claude_config_path.display(),
                    "Claude config is not a JSON object (found {}), ignoring it",
                    json_kind(&other)
                );
                Map::new()
            },
            None => Map::new(),
        }
    }

    pub fn write_claude_config(&self, config: &Map<String, Value>) -> Result<()> {
        let _guard = self
            .claude_config_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        write_document(&self.claude_config_path, config)?;
        tracing::info!(
            path = %self.claude_config_path.display(),
            "Wrote Claude configuration"
        );
        Ok(())
    }
}

fn read_document<T: DeserializeOwned>(path: &Path, label: &str) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("{} file does not exist at {}", label, path.display());
            return None;
        },
        Err(e) => {
            tracing::error!("IO error reading {} file {}: {}", label, path.display(), e);
            return None;
        },
    };

    if content.trim().is_empty() {
        tracing::info!("{} file is empty at {}", label, path.display());
        return None;
    }

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Error parsing JSON in {} file {}: {}", label, path.display(), e);
            None
        },
    }
}

/// Pretty-print `value` to a sibling temp file, then rename it over `path`.
fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source: std::io::Error| ManagerError::ConfigIo {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.json".to_string());
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let result = fs::File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp_path, path));

    if let Err(e) = result {
        fs::remove_file(&tmp_path).ok();
        tracing::error!("IO error writing {}: {}", path.display(), e);
        return Err(io_err(e));
    }

    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ConfigStore {
        ConfigStore::new(
            temp.path().join("data").join("installed_servers.json"),
            temp.path().join("claude").join("claude_desktop_config.json"),
        )
    }

    fn entry(id: &str, name: &str) -> ServerEntry {
        ServerEntry {
            id: id.to_string(),
            name: name.to_string(),
            command: vec!["node".to_string()],
            arguments: vec![],
            environment: BTreeMap::new(),
            enabled_in_claude: false,
            source_type: None,
            source_location: None,
        }
    }

    #[test]
    fn test_missing_documents_read_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        assert!(store.read_inventory().is_empty());
        assert!(store.read_claude_config().is_empty());
    }

    #[test]
    fn test_empty_and_corrupt_documents_read_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.inventory_path().parent().unwrap()).unwrap();
        fs::create_dir_all(store.claude_config_path().parent().unwrap()).unwrap();

        fs::write(store.inventory_path(), "   \n").unwrap();
        fs::write(store.claude_config_path(), "{ invalid json }").unwrap();
        assert!(store.read_inventory().is_empty());
        assert!(store.read_claude_config().is_empty());

        fs::write(store.inventory_path(), r#"{"not": "a list"}"#).unwrap();
        fs::write(store.claude_config_path(), "[1, 2, 3]").unwrap();
        assert!(store.read_inventory().is_empty());
        assert!(store.read_claude_config().is_empty());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.write_inventory(&[entry("1", "svc")]).unwrap();
        assert!(store.inventory_path().exists());

        let read = store.read_inventory();
        assert_eq!(read, vec![entry("1", "svc")]);
    }

    #[test]
    fn test_inventory_is_pretty_printed() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.write_inventory(&[entry("1", "svc")]).unwrap();
        let content = fs::read_to_string(store.inventory_path()).unwrap();

        assert!(content.starts_with("[\n"));
        assert!(content.contains("  {"));
    }

    #[test]
    fn test_claude_config_round_trip_keeps_key_order() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.claude_config_path().parent().unwrap()).unwrap();
        fs::write(
            store.claude_config_path(),
            r#"{"zeta": 1, "alpha": {"nested": true}, "mcpServers": {}}"#,
        )
        .unwrap();

        let config = store.read_claude_config();
        store.write_claude_config(&config).unwrap();

        let keys: Vec<String> = store.read_claude_config().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mcpServers"]);
        assert_eq!(store.read_claude_config()["alpha"], json!({"nested": true}));
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.write_inventory(&[]).unwrap();
        let leftovers: Vec<_> = fs::read_dir(store.inventory_path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();

        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = ConfigStore::new(blocker.join("installed_servers.json"), blocker.join("c.json"));

        let result = store.write_inventory(&[]);
        assert!(matches!(result, Err(ManagerError::ConfigIo { .. })));

        let result = store.write_claude_config(&Map::new());
        assert!(matches!(result, Err(ManagerError::ConfigIo { .. })));
    }

    #[test]
    fn test_bad_record_does_not_hide_the_others() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.inventory_path().parent().unwrap()).unwrap();
        let original = r#"[
            {"id": "1", "name": "keep-me", "command": ["node"]},
            {"id": "2", "name": "numeric-env", "command": ["node"], "environment": {"PORT": 3000}},
            {"name": "no-id", "command": ["node"]},
            "not a record"
        ]"#;
        fs::write(store.inventory_path(), original).unwrap();

        let names: Vec<String> = store.read_inventory().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["keep-me", "numeric-env"]);

        // Skipped records survive in the backup
        let backup = fs::read_to_string(store.inventory_backup_path()).unwrap();
        assert_eq!(backup, original);
    }

    #[test]
    fn test_clean_inventory_makes_no_backup() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.write_inventory(&[entry("1", "svc")]).unwrap();
        assert_eq!(store.read_inventory().len(), 1);
        assert!(!store.inventory_backup_path().exists());
    }
}
