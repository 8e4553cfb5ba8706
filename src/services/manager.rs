//! Service lifecycle management: registration, spawning, graceful shutdown.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

/// A long-running component hosted by the process.
///
/// `run` should return promptly once the shutdown receiver fires.
#[async_trait]
pub trait Service: Send {
    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>);
}

pub struct ServiceManager {
    shutdown_tx: broadcast::Sender<()>,
    services: Vec<(&'static str, Box<dyn Service>)>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            services: Vec::new(),
            handles: Vec::new(),
        }
    }

    pub fn register_service(&mut self, name: &'static str, service: Box<dyn Service>) {
        self.services.push((name, service));
    }

    pub fn has_services(&self) -> bool {
        !self.services.is_empty()
    }

    /// Spawn every registered service on its own task.
    pub fn spawn_all(&mut self) {
        for (name, service) in self.services.drain(..) {
            let shutdown_rx = self.shutdown_tx.subscribe();
            let mut service = service;
            let handle = tokio::spawn(async move {
                service.run(shutdown_rx).await;
            });
            info!(service = name, "service started");
            self.handles.push((name, handle));
        }
    }

    /// Broadcast shutdown and wait up to `timeout` for every service to stop.
    ///
    /// Returns `false` when any service panicked or missed the deadline.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        let _ = self.shutdown_tx.send(());

        let deadline = time::Instant::now() + timeout;
        let mut clean = true;
        for (name, handle) in self.handles.drain(..) {
            match time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => info!(service = name, "service stopped"),
                Ok(Err(e)) => {
                    error!(service = name, error = ?e, "service task panicked");
                    clean = false;
                }
                Err(_) => {
                    warn!(service = name, "service did not stop before the deadline");
                    clean = false;
                }
            }
        }
        clean
    }
}
