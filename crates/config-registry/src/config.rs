//! Process configuration for the config registry

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config registry process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Agent fleet configuration
    #[serde(default)]
    pub agents: AgentConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the sled database directory
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

/// Agent fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Endpoints nudged when the registry changes
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Seconds between nudge cycles
    #[serde(default = "default_nudge_interval_secs")]
    pub nudge_interval_secs: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./config-registry-data/registry.db")
}

fn default_nudge_interval_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            nudge_interval_secs: default_nudge_interval_secs(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            agents: AgentConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from file
    pub async fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use async_fs::File;
        use futures::io::AsyncReadExt;

        let mut file = File::open(path.as_ref()).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        // Try YAML first, then JSON
        if path.as_ref().extension().and_then(|s| s.to_str()) == Some("yaml")
            || path.as_ref().extension().and_then(|s| s.to_str()) == Some("yml")
        {
            Ok(serde_yaml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }

    /// Apply environment overrides
    ///
    /// `PORT` rebinds the server to all interfaces on that port,
    /// `AGENT_ENDPOINTS` is a comma-separated URL list, and
    /// `NUDGE_INTERVAL_SECS` adjusts the notifier schedule.
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            self.server.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Ok(list) = std::env::var("AGENT_ENDPOINTS") {
            self.agents.endpoints = parse_endpoint_list(&list);
        }
        if let Ok(secs) = std::env::var("NUDGE_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.agents.nudge_interval_secs = secs;
            }
        }
    }
}

/// Split a comma-separated endpoint list, dropping empty entries
pub fn parse_endpoint_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = RegistryConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: RegistryConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.server.listen_addr, config.server.listen_addr);
        assert_eq!(parsed.agents.nudge_interval_secs, 300);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let parsed: RegistryConfig =
            serde_yaml::from_str("agents:\n  endpoints: [\"http://agent-1:8080/reload\"]\n")
                .unwrap();
        assert_eq!(parsed.agents.endpoints.len(), 1);
        assert_eq!(parsed.agents.nudge_interval_secs, 300);
        assert_eq!(parsed.server.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_endpoint_list() {
        assert_eq!(
            parse_endpoint_list("http://a:1/reload, http://b:2/reload"),
            vec![
                "http://a:1/reload".to_string(),
                "http://b:2/reload".to_string()
            ]
        );
        assert!(parse_endpoint_list("").is_empty());
        assert!(parse_endpoint_list(" , ,").is_empty());
    }
}
