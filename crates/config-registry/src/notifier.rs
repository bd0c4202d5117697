//! Background loop that nudges agents to reload their configuration

use crate::error::Result;
use crate::registry::Registry;
use futures::future::Either;
use futures::pin_mut;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default interval between nudge cycles
pub const DEFAULT_NUDGE_INTERVAL: Duration = Duration::from_secs(300);

/// Timeout for a single nudge call, so one unreachable agent cannot stall
/// the tick indefinitely
const NUDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timer-driven notifier that tells agents when the registry has changed
///
/// Runs independently of request handling for the lifetime of the registry.
/// Each tick it checks the reload flag and, when set, issues one best-effort
/// GET to every configured agent endpoint, sequentially, in listed order.
/// The flag is cleared only when every endpoint was reached; a partial
/// failure leaves it set so the next tick tries again.
///
/// The loop never reports errors to a caller; there is none. It stops when
/// its [`NotifierHandle`] is dropped or shut down.
pub struct ChangeNotifier {
    registry: Arc<Registry>,
    endpoints: Vec<String>,
    interval: Duration,
    client: reqwest::Client,
    shutdown: async_channel::Receiver<()>,
}

/// Handle that stops a running [`ChangeNotifier`] when shut down or dropped
pub struct NotifierHandle {
    shutdown: async_channel::Sender<()>,
}

impl NotifierHandle {
    /// Stop the notifier loop
    pub fn shutdown(self) {
        drop(self.shutdown);
    }
}

impl ChangeNotifier {
    /// Create a notifier for the given agent endpoints
    ///
    /// `endpoints` comes from process configuration
    /// (see [`crate::config::AgentConfig`]). The caller spawns the returned
    /// notifier's [`run`](ChangeNotifier::run) future on its executor.
    pub fn new(
        registry: Arc<Registry>,
        endpoints: Vec<String>,
        interval: Duration,
    ) -> Result<(Self, NotifierHandle)> {
        let (tx, rx) = async_channel::bounded(1);

        let notifier = Self {
            registry,
            endpoints,
            interval,
            client: reqwest::Client::builder().timeout(NUDGE_TIMEOUT).build()?,
            shutdown: rx,
        };

        Ok((notifier, NotifierHandle { shutdown: tx }))
    }

    /// Run the nudge loop until the handle is shut down
    pub async fn run(self) {
        info!(
            "Change notifier running every {:?} for {} agent endpoint(s)",
            self.interval,
            self.endpoints.len()
        );

        loop {
            let tick_due = {
                let timer = smol::Timer::after(self.interval);
                let stopped = self.shutdown.recv();
                pin_mut!(timer, stopped);

                match futures::future::select(timer, stopped).await {
                    Either::Left(_) => true,
                    // Channel closed: the handle is gone
                    Either::Right(_) => false,
                }
            };

            if !tick_due {
                break;
            }

            self.tick().await;
        }

        info!("Change notifier stopped");
    }

    /// Run a single nudge cycle
    ///
    /// Does nothing while the reload flag is unset, and touches neither the
    /// flag nor the network when no endpoints are configured.
    pub async fn tick(&self) {
        if !self.registry.needs_reload() {
            return;
        }

        if self.endpoints.is_empty() {
            return;
        }

        let mut delivered = true;
        for endpoint in &self.endpoints {
            // Any HTTP response counts as delivered; only transport errors
            // are failures
            match self.client.get(endpoint).send().await {
                Ok(_) => debug!("Nudged agent at {}", endpoint),
                Err(e) => {
                    warn!("Failed to nudge agent at {}: {}", endpoint, e);
                    delivered = false;
                }
            }
        }

        if delivered {
            self.registry.clear_needs_reload();
        }
    }
}
