//! Error types for the config registry

use thiserror::Error;

/// Config registry error type
#[derive(Error, Debug)]
pub enum Error {
    /// A record failed validation before reaching the store
    #[error("Invalid config record: {0}")]
    Validation(String),

    /// No record stored under the requested service name
    #[error("Service not found: {0}")]
    NotFound(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error while reaching an agent or a bulk-import source
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
