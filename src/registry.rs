//! In-memory operations over the server inventory.

use crate::error::{ManagerError, Result};
use crate::models::{NewServer, ServerEntry};

/// Outcome of resolving an identifier that may be an id or a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Index of the matching entry.
    Found(usize),
    NotFound,
    /// More than one entry carries the name; holds the match count.
    Ambiguous(usize),
}

impl Lookup {
    /// Convert into an index, mapping misses onto the error taxonomy.
    pub fn into_result(self, identifier: &str) -> Result<usize> {
        match self {
            Lookup::Found(index) => Ok(index),
            Lookup::NotFound => Err(ManagerError::NotFound(identifier.to_string())),
            Lookup::Ambiguous(_) => Err(ManagerError::Ambiguous(identifier.to_string())),
        }
    }
}

/// Resolve `identifier` against ids first, then against names.
///
/// Ids are unique, so the first id hit wins even if another entry is named
/// after that id.
pub fn find_by_identifier(servers: &[ServerEntry], identifier: &str) -> Lookup {
    if let Some(index) = servers.iter().position(|s| s.id == identifier) {
        tracing::debug!("Found server with ID '{}'", identifier);
        return Lookup::Found(index);
    }

    let mut matches = servers
        .iter()
        .enumerate()
        .filter(|(_, s)| s.name == identifier)
        .map(|(index, _)| index);

    let first = matches.next();
    match (first, matches.count()) {
        (None, _) => {
            tracing::warn!("No server found with identifier '{}'", identifier);
            Lookup::NotFound
        },
        (Some(index), 0) => {
            tracing::debug!("Found server with name '{}'", identifier);
            Lookup::Found(index)
        },
        (Some(_), rest) => {
            tracing::warn!(
                "Multiple servers found with name '{}' ({} matches)",
                identifier,
                rest + 1
            );
            Lookup::Ambiguous(rest + 1)
        },
    }
}

/// Opaque, random identifier for a new entry.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Check the fields of a registration request before anything touches disk.
pub fn validate(new_server: &NewServer) -> Result<()> {
    if new_server.name.trim().is_empty() {
        return Err(ManagerError::InvalidInput(
            "Server name cannot be empty".to_string(),
        ));
    }

    match new_server.command.first() {
        None => {
            return Err(ManagerError::InvalidInput(
                "Server command cannot be empty".to_string(),
            ))
        },
        Some(executable) if executable.trim().is_empty() => {
            return Err(ManagerError::InvalidInput(
                "Server command executable cannot be blank".to_string(),
            ))
        },
        Some(_) => {},
    }

    if new_server.environment.keys().any(|k| k.trim().is_empty()) {
        return Err(ManagerError::InvalidInput(
            "Environment variable names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Fail with `DuplicateName` if `name` is already taken (exact match).
pub fn ensure_unique_name(servers: &[ServerEntry], name: &str) -> Result<()> {
    if servers.iter().any(|s| s.name == name) {
        return Err(ManagerError::DuplicateName(name.to_string()));
    }
    Ok(())
}

/// Append a new entry with a fresh id, disabled in Claude Desktop.
///
/// Returns the created entry; `servers` is extended in place.
pub fn register(servers: &mut Vec<ServerEntry>, new_server: NewServer) -> Result<ServerEntry> {
    ensure_unique_name(servers, &new_server.name)?;

    let entry = ServerEntry {
        id: generate_id(),
        name: new_server.name,
        command: new_server.command,
        arguments: new_server.arguments,
        environment: new_server.environment,
        enabled_in_claude: false,
        source_type: new_server.source_type,
        source_location: new_server.source_location,
    };

    crate::log_server_operation!("register", entry.name.as_str(), entry.id.as_str());
    servers.push(entry.clone());
    Ok(entry)
}
