//! Keeps the inventory and Claude Desktop's `mcpServers` map consistent.
//!
//! The Claude entry for a server is a projection of its inventory record.
//! Discovery runs the other way and imports Claude-only entries.

use crate::error::{ManagerError, Result};
use crate::models::{env_value_to_string, ExternalServerSpec, ServerEntry};
use crate::registry;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Top-level key of Claude Desktop's config holding the server map.
pub const MCP_SERVERS_KEY: &str = "mcpServers";

/// Name under which the manager registers itself.
pub const SELF_SERVER_NAME: &str = "mcp-manager";
pub const SELF_SOURCE_TYPE: &str = "self";
pub const DISCOVERED_SOURCE_TYPE: &str = "claude_config";
pub const DISCOVERED_SOURCE_LOCATION: &str = "Discovered from Claude Desktop configuration";

/// Project an inventory entry into its `mcpServers` form.
///
/// `None` means the server must be absent from Claude's config.
pub fn project_to_external(entry: &ServerEntry) -> Result<Option<ExternalServerSpec>> {
    if !entry.enabled_in_claude {
        return Ok(None);
    }

    let command = entry.executable().ok_or_else(|| {
        ManagerError::CommandInvalid(format!("Server '{}' has no command", entry.name))
    })?;

    let has_env = entry.environment.values().any(|v| !v.is_empty());

    Ok(Some(ExternalServerSpec {
        command: command.to_string(),
        args: entry.invocation_args(),
        env: has_env.then(|| entry.environment.clone()),
    }))
}

/// Add, replace or remove `name` in the server map of `config`.
///
/// Every other key of `config` is left as it was.
pub fn apply_to_external_config(
    config: &mut Map<String, Value>,
    name: &str,
    spec: Option<&ExternalServerSpec>,
) -> Result<()> {
    match config.get(MCP_SERVERS_KEY) {
        Some(Value::Object(_)) => {},
        Some(_) => {
            tracing::warn!(
                "{} in Claude config is not an object, replacing it",
                MCP_SERVERS_KEY
            );
            config.insert(MCP_SERVERS_KEY.to_string(), Value::Object(Map::new()));
        },
        None => {
            tracing::info!("Creating new {} section in Claude config", MCP_SERVERS_KEY);
            config.insert(MCP_SERVERS_KEY.to_string(), Value::Object(Map::new()));
        },
    }

    if let Some(Value::Object(servers)) = config.get_mut(MCP_SERVERS_KEY) {
        match spec {
            None => {
                if servers.shift_remove(name).is_some() {
                    tracing::info!("Removing server '{}' from Claude config", name);
                }
            },
            Some(spec) => {
                tracing::info!("Adding/updating server '{}' in Claude config", name);
                servers.insert(name.to_string(), serde_json::to_value(spec)?);
            },
        }
    }

    Ok(())
}

/// What a discovery pass added to the inventory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Names imported from Claude's config.
    pub imported: Vec<String>,
    /// Whether the self-entry had to be created.
    pub self_registered: bool,
}

impl DiscoveryReport {
    pub fn changed(&self) -> bool {
        !self.imported.is_empty() || self.self_registered
    }
}

/// Import Claude-only servers into `servers` and make sure the self-entry
/// exists.
///
/// Entries already present by name are never touched. `self_command` is the
/// command recorded if the self-entry has to be created.
pub fn discover_from_external(
    servers: &mut Vec<ServerEntry>,
    config: &Map<String, Value>,
    self_command: &[String],
) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    let mut known: HashSet<String> = servers.iter().map(|s| s.name.clone()).collect();

    match config.get(MCP_SERVERS_KEY) {
        Some(Value::Object(external)) => {
            for (name, value) in external {
                if known.contains(name) {
                    tracing::debug!("Server '{}' already in inventory, skipping", name);
                    continue;
                }

                let Some(spec) = parse_external_spec(value) else {
                    tracing::warn!(
                        "Server '{}' in Claude config has no command, skipping",
                        name
                    );
                    continue;
                };

                servers.push(ServerEntry {
                    id: registry::generate_id(),
                    name: name.clone(),
                    command: vec![spec.command],
                    arguments: spec.args,
                    environment: spec.env.unwrap_or_default(),
                    enabled_in_claude: true,
                    source_type: Some(DISCOVERED_SOURCE_TYPE.to_string()),
                    source_location: Some(DISCOVERED_SOURCE_LOCATION.to_string()),
                });
                known.insert(name.clone());
                report.imported.push(name.clone());
                tracing::info!("Added server '{}' from Claude config to inventory", name);
            }
        },
        Some(_) => tracing::warn!("{} in Claude config is not an object", MCP_SERVERS_KEY),
        None => tracing::info!("No MCP servers found in Claude Desktop config"),
    }

    if !known.contains(SELF_SERVER_NAME) {
        servers.push(ServerEntry {
            id: registry::generate_id(),
            name: SELF_SERVER_NAME.to_string(),
            command: self_command.to_vec(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
            enabled_in_claude: false,
            source_type: Some(SELF_SOURCE_TYPE.to_string()),
            source_location: Some("Registered automatically by MCP Manager".to_string()),
        });
        report.self_registered = true;
        tracing::info!("Registered '{}' in inventory", SELF_SERVER_NAME);
    }

    report
}

/// Lenient read of one `mcpServers` entry: a missing or blank command yields
/// `None`, malformed `args`/`env` members are dropped.
fn parse_external_spec(value: &Value) -> Option<ExternalServerSpec> {
    let command = value
        .get("command")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())?;

    let args = value
        .get("args")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let env = value.get("env").and_then(Value::as_object).map(|vars| {
        vars.iter()
            .filter_map(|(k, v)| env_value_to_string(v.clone()).map(|v| (k.clone(), v)))
            .collect::<BTreeMap<_, _>>()
    });

    Some(ExternalServerSpec {
        command: command.to_string(),
        args,
        env,
    })
}

/// Command recorded for the self-entry: this executable in MCP mode.
pub fn self_command() -> Vec<String> {
    let exe = std::env::current_exe()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string());
    vec![exe, "mcp-server".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn svc_entry(enabled: bool) -> ServerEntry {
        ServerEntry {
            id: "1".to_string(),
            name: "svc".to_string(),
            command: vec!["node".to_string(), "app.js".to_string()],
            arguments: vec!["--port".to_string(), "3".to_string()],
            environment: BTreeMap::new(),
            enabled_in_claude: enabled,
            source_type: None,
            source_location: None,
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn self_cmd() -> Vec<String> {
        vec!["/usr/bin/mcp-manager".to_string(), "mcp-server".to_string()]
    }

    #[test]
    fn test_project_disabled_is_none() {
        assert_eq!(project_to_external(&svc_entry(false)).unwrap(), None);
    }

    #[test]
    fn test_project_enabled_without_env() {
        let spec = project_to_external(&svc_entry(true)).unwrap().unwrap();

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"command": "node", "args": ["app.js", "--port", "3"]})
        );
    }

    #[test]
    fn test_project_omits_all_blank_env() {
        let mut entry = svc_entry(true);
        entry.environment.insert("TOKEN".to_string(), String::new());

        let spec = project_to_external(&entry).unwrap().unwrap();
        assert!(spec.env.is_none());
    }

    #[test]
    fn test_project_includes_env_with_values() {
        let mut entry = svc_entry(true);
        entry.environment.insert("TOKEN".to_string(), "abc".to_string());

        let spec = project_to_external(&entry).unwrap().unwrap();
        assert_eq!(spec.env.unwrap()["TOKEN"], "abc");
    }

    #[test]
    fn test_project_enabled_without_command_fails() {
        let mut entry = svc_entry(true);
        entry.command.clear();

        assert!(matches!(
            project_to_external(&entry),
            Err(ManagerError::CommandInvalid(_))
        ));
    }

    #[test]
    fn test_project_is_stable_across_toggles() {
        let mut entry = svc_entry(true);
        let first = project_to_external(&entry).unwrap();
        entry.enabled_in_claude = false;
        assert!(project_to_external(&entry).unwrap().is_none());
        entry.enabled_in_claude = true;
        assert_eq!(project_to_external(&entry).unwrap(), first);
    }

    #[test]
    fn test_apply_creates_server_map() {
        let mut config = Map::new();
        let spec = project_to_external(&svc_entry(true)).unwrap();

        apply_to_external_config(&mut config, "svc", spec.as_ref()).unwrap();

        assert_eq!(config[MCP_SERVERS_KEY]["svc"]["command"], json!("node"));
    }

    #[test]
    fn test_apply_remove_absent_is_noop() {
        let mut config = object(json!({"mcpServers": {"other": {"command": "x"}}}));

        apply_to_external_config(&mut config, "svc", None).unwrap();

        assert_eq!(
            Value::Object(config),
            json!({"mcpServers": {"other": {"command": "x"}}})
        );
    }

    #[test]
    fn test_apply_preserves_unrelated_keys_byte_for_byte() {
        let original = r#"{"theme":"dark","globalShortcut":"Ctrl+Space","mcpServers":{"other":{"command":"x","args":[]}},"extra":[1,2,{"a":null}]}"#;
        let mut config: Map<String, Value> = serde_json::from_str(original).unwrap();
        let spec = project_to_external(&svc_entry(true)).unwrap();

        apply_to_external_config(&mut config, "svc", spec.as_ref()).unwrap();
        apply_to_external_config(&mut config, "svc", spec.as_ref()).unwrap();
        apply_to_external_config(&mut config, "svc", None).unwrap();

        assert_eq!(serde_json::to_string(&config).unwrap(), original);
    }

    #[test]
    fn test_apply_replaces_non_object_server_map() {
        let mut config = object(json!({"mcpServers": "broken", "keep": true}));
        let spec = project_to_external(&svc_entry(true)).unwrap();

        apply_to_external_config(&mut config, "svc", spec.as_ref()).unwrap();

        assert!(config[MCP_SERVERS_KEY]["svc"].is_object());
        assert_eq!(config["keep"], json!(true));
    }

    #[test]
    fn test_discover_imports_external_entries() {
        let mut servers = Vec::new();
        let config = object(json!({"mcpServers": {"foo": {"command": "bar", "args": ["-x"]}}}));

        let report = discover_from_external(&mut servers, &config, &self_cmd());

        assert_eq!(report.imported, vec!["foo"]);
        assert!(report.self_registered);
        assert_eq!(servers.len(), 2);

        let foo = servers.iter().find(|s| s.name == "foo").unwrap();
        assert_eq!(foo.command, vec!["bar"]);
        assert_eq!(foo.arguments, vec!["-x"]);
        assert!(foo.enabled_in_claude);
        assert_eq!(foo.source_type.as_deref(), Some(DISCOVERED_SOURCE_TYPE));

        let own: Vec<_> = servers
            .iter()
            .filter(|s| s.name == SELF_SERVER_NAME)
            .collect();
        assert_eq!(own.len(), 1);
        assert!(!own[0].enabled_in_claude);
        assert_eq!(own[0].source_type.as_deref(), Some(SELF_SOURCE_TYPE));
    }

    #[test]
    fn test_discover_is_idempotent() {
        let mut servers = Vec::new();
        let config = object(json!({"mcpServers": {
            "foo": {"command": "bar"},
            "baz": {"command": "qux", "env": {"K": "V"}}
        }}));

        discover_from_external(&mut servers, &config, &self_cmd());
        let snapshot = servers.clone();
        let second = discover_from_external(&mut servers, &config, &self_cmd());

        assert!(!second.changed());
        assert_eq!(servers, snapshot);
    }

    #[test]
    fn test_discover_skips_existing_names_without_merging() {
        let mut existing = svc_entry(false);
        existing.name = "foo".to_string();
        let mut servers = vec![existing.clone()];
        let config = object(json!({"mcpServers": {"foo": {"command": "different"}}}));

        discover_from_external(&mut servers, &config, &self_cmd());

        assert_eq!(servers[0], existing);
    }

    #[test]
    fn test_discover_skips_entries_without_command() {
        let mut servers = Vec::new();
        let config = object(json!({"mcpServers": {
            "empty": {"command": ""},
            "missing": {"args": ["x"]},
            "ok": {"command": "run", "args": ["a", 1, "b"], "env": {"N": 2, "S": "s"}}
        }}));

        let report = discover_from_external(&mut servers, &config, &self_cmd());

        assert_eq!(report.imported, vec!["ok"]);
        let ok = servers.iter().find(|s| s.name == "ok").unwrap();
        assert_eq!(ok.arguments, vec!["a", "b"]);
        assert_eq!(ok.environment.len(), 2);
        assert_eq!(ok.environment["N"], "2");
        assert_eq!(ok.environment["S"], "s");
    }

    #[test]
    fn test_discover_keeps_existing_self_entry() {
        let mut own = svc_entry(true);
        own.name = SELF_SERVER_NAME.to_string();
        let mut servers = vec![own];

        let report = discover_from_external(&mut servers, &Map::new(), &self_cmd());

        assert!(!report.changed());
        assert_eq!(servers.len(), 1);
        assert!(servers[0].enabled_in_claude);
    }

    #[test]
    fn test_discover_does_not_duplicate_self_when_claude_lists_it() {
        let mut servers = Vec::new();
        let config = object(json!({"mcpServers": {
            "mcp-manager": {"command": "/opt/mcp-manager", "args": ["mcp-server"]}
        }}));

        let report = discover_from_external(&mut servers, &config, &self_cmd());

        assert_eq!(report.imported, vec![SELF_SERVER_NAME]);
        assert!(!report.self_registered);
        assert_eq!(servers.len(), 1);
    }
}
