//! Central registry for monitoring-agent configuration
//!
//! This crate stores per-service monitoring configuration (polling targets,
//! status-page URL, webhook, poll frequency) for a fleet of independent
//! monitoring agents, and nudges those agents when the stored set changes so
//! they can refresh their local copy. The registry performs no monitoring
//! itself; it only stores and distributes configuration.
//!
//! # Architecture
//!
//! The core is runtime-agnostic, working with any async runtime (tokio,
//! async-std, smol, etc). It uses:
//!
//! - `sled` for the persistent record store
//! - `async-tungstenite` for the WebSocket transport (without runtime features)
//! - `async-net` for networking
//! - `reqwest` for outbound HTTP (agent nudges and bulk import; needs a
//!   tokio context at runtime)
//! - Standard `futures` traits
//!
//! # Example
//!
//! ```no_run
//! use config_registry::{ChangeNotifier, Registry, WsServer};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> config_registry::Result<()> {
//! // Open the registry
//! let registry = Arc::new(Registry::open("./registry.db").await?);
//!
//! // Spawn the notifier on the executor of your choice
//! let endpoints = vec!["http://agent-1:8080/reload".to_string()];
//! let (notifier, handle) =
//!     ChangeNotifier::new(registry.clone(), endpoints, Duration::from_secs(300))?;
//! // e.g. tokio::spawn(notifier.run());
//!
//! // Serve the management API
//! let server = WsServer::new("127.0.0.1:8080", registry).await?;
//! loop {
//!     let handler = server.accept().await?;
//!     // User chooses how to run the handler
//!     // e.g., tokio::spawn, smol::spawn, etc.
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod notifier;
pub mod registry;
pub mod websocket;

pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use models::*;
pub use notifier::{ChangeNotifier, NotifierHandle};
pub use registry::Registry;
pub use websocket::{ConnectionHandler, WsServer};

/// Re-export key types for convenience
pub mod prelude {
    pub use crate::{
        ChangeNotifier, ConfigRecord, Error, Registry, RegistryConfig, Result, WsServer,
    };
}
