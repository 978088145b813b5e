use crate::error::{ManagerError, Result};
use crate::models::NewServer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// API error response
#[derive(Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Body of `PUT /api/servers/:identifier/status`
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub enabled: bool,
}

/// Registration form posted by the web page. Command and arguments are
/// whitespace-separated; environment is one `KEY=VALUE` per line.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterServerForm {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub environment: String,
}

impl RegisterServerForm {
    pub fn into_new_server(self) -> Result<NewServer> {
        Ok(NewServer {
            name: self.name.trim().to_string(),
            command: split_words(&self.command),
            arguments: split_words(&self.arguments),
            environment: parse_environment(&self.environment)?,
            source_type: Some("manual".to_string()),
            source_location: Some("Registered via web interface".to_string()),
        })
    }
}

/// Restart result returned to the page.
#[derive(Debug, Serialize)]
pub struct RestartResponse {
    pub status: String,
    pub action: String,
    pub message: String,
}

pub fn split_words(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped; the
/// value keeps everything after the first `=`.
pub fn parse_environment(input: &str) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();

    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ManagerError::InvalidInput(format!(
                "Environment line {} is not KEY=VALUE: {}",
                number + 1,
                line
            )));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ManagerError::InvalidInput(format!(
                "Environment line {} has an empty variable name",
                number + 1
            )));
        }
        env.insert(key.to_string(), value.trim().to_string());
    }

    Ok(env)
}
