use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("No server found with identifier '{0}'.")]
    NotFound(String),

    #[error("Multiple servers found with name '{0}'. Use unique ID.")]
    Ambiguous(String),

    #[error("A server named '{0}' is already registered")]
    DuplicateName(String),

    #[error("{0}")]
    CommandInvalid(String),

    #[error("{0}")]
    ProcessOpFailed(String),

    #[error("Failed to write {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ManagerError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            ManagerError::NotFound(_) => "SERVER_NOT_FOUND",
            ManagerError::Ambiguous(_) => "AMBIGUOUS_IDENTIFIER",
            ManagerError::DuplicateName(_) => "DUPLICATE_NAME",
            ManagerError::CommandInvalid(_) => "COMMAND_INVALID",
            ManagerError::ProcessOpFailed(_) => "PROCESS_OP_FAILED",
            ManagerError::ConfigIo { .. } => "CONFIG_IO_ERROR",
            ManagerError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            ManagerError::InvalidInput(_) => "INVALID_INPUT",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
