//! Config registry daemon
//!
//! Opens the persistent registry, serves the management API and keeps the
//! agent fleet notified about configuration changes.

use anyhow::Result;
use clap::Parser;
use config_registry::{ChangeNotifier, Registry, RegistryConfig, WsServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "config-registryd")]
#[command(about = "Configuration registry for monitoring agents", long_about = None)]
struct Args {
    /// Path to a YAML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file
    #[arg(short, long)]
    listen: Option<String>,

    /// Database directory, overriding the configuration file
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            RegistryConfig::from_file(path).await?
        }
        None => RegistryConfig::default(),
    };
    config.apply_env();
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.db_path = data_dir;
    }

    info!("Starting config registry on {}", config.server.listen_addr);
    info!("Database: {}", config.storage.db_path.display());

    // No registry without its store
    let registry = Arc::new(Registry::open(&config.storage.db_path).await?);

    let (notifier, notifier_handle) = ChangeNotifier::new(
        registry.clone(),
        config.agents.endpoints.clone(),
        Duration::from_secs(config.agents.nudge_interval_secs),
    )?;
    let notifier_task = tokio::spawn(notifier.run());

    let server = WsServer::new(&config.server.listen_addr, registry).await?;

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(handler) => {
                    tokio::spawn(handler.handle());
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    notifier_handle.shutdown();
    notifier_task.await?;

    Ok(())
}
