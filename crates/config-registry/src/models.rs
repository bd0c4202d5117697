//! Data models for the config registry

use serde::{Deserialize, Serialize};

/// Monitoring configuration stored for a single service
///
/// The `service_name` is the sole identity of a record; every other field is
/// optional and left at its empty value when unset. Partial records are valid
/// payloads for merge-updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Unique service identifier
    #[serde(default)]
    pub service_name: String,

    /// Display label for the service, empty when unset
    #[serde(default)]
    pub display_domain: String,

    /// Public status page URL, empty when unset
    #[serde(default)]
    pub status_page: String,

    /// Webhook URL invoked by the monitoring agent, empty when unset
    #[serde(default)]
    pub target_hook: String,

    /// Agent-side poll interval in seconds, 0 when unset
    #[serde(default)]
    pub poll_frequency: u64,

    /// Ordered list of URLs or paths the agent polls
    #[serde(default)]
    pub poll_pages: Option<Vec<String>>,
}

impl ConfigRecord {
    /// Create a new record for the given service
    pub fn new(service_name: impl Into<String>) -> crate::Result<Self> {
        let service_name = service_name.into();
        if service_name.trim().is_empty() {
            return Err(crate::Error::Validation(
                "service name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            service_name,
            ..Self::default()
        })
    }

    /// Merge an incoming partial record over this stored record
    ///
    /// Scalar fields keep the stored value unless the incoming value is
    /// non-empty (non-zero for `poll_frequency`). `poll_pages` is replaced
    /// whenever the incoming record carries a list, including an explicit
    /// empty one; an absent incoming list keeps the stored pages.
    pub fn merge_from(&self, incoming: &ConfigRecord) -> ConfigRecord {
        ConfigRecord {
            service_name: self.service_name.clone(),
            display_domain: overwrite_if_set(&self.display_domain, &incoming.display_domain),
            status_page: overwrite_if_set(&self.status_page, &incoming.status_page),
            target_hook: overwrite_if_set(&self.target_hook, &incoming.target_hook),
            poll_frequency: if incoming.poll_frequency != 0 {
                incoming.poll_frequency
            } else {
                self.poll_frequency
            },
            poll_pages: incoming
                .poll_pages
                .clone()
                .or_else(|| self.poll_pages.clone()),
        }
    }
}

/// Keep `current` unless `incoming` carries a value
fn overwrite_if_set(current: &str, incoming: &str) -> String {
    if incoming.is_empty() {
        current.to_string()
    } else {
        incoming.to_string()
    }
}

/// WebSocket message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Client request
    Request {
        /// Request ID for correlation
        id: String,
        /// Action to perform
        action: Action,
        /// Action parameters
        params: serde_json::Value,
    },
    /// Server response
    Response {
        /// Request ID
        id: String,
        /// Response data
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        /// Error information
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
    },
}

/// Available actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// List all config records
    ListConfigs,
    /// Get the record for one service
    GetConfig,
    /// Store a record
    AddConfig,
    /// Remove a record
    RemoveConfig,
    /// Merge-update an existing record
    UpdateConfig,
    /// Export every record
    ExportConfigs,
    /// Import records from a remote or local source
    ImportConfigs,
}

/// Error information carried in a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
}
