use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A server registered in the local inventory (`installed_servers.json`).
///
/// `command` holds the executable followed by any arguments that are always
/// passed; `arguments` are appended after them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default, deserialize_with = "lenient_environment")]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub enabled_in_claude: bool,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_location: Option<String>,
}

impl ServerEntry {
    /// The executable, if the command is not empty.
    pub fn executable(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Full argument vector passed after the executable.
    pub fn invocation_args(&self) -> Vec<String> {
        self.command
            .iter()
            .skip(1)
            .chain(self.arguments.iter())
            .cloned()
            .collect()
    }
}

/// Environment map that also accepts numbers and booleans, which hand-edited
/// Claude configs carry. They are kept in their JSON text form; nulls are dropped.
fn lenient_environment<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| env_value_to_string(value).map(|v| (key, v)))
        .collect())
}

/// Text form of an environment value, `None` for null.
pub fn env_value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// One entry of the `mcpServers` map in Claude Desktop's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalServerSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

/// Fields supplied when registering a server. The id and enabled flag are
/// assigned by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewServer {
    pub name: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_location: Option<String>,
}
