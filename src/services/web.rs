//! HTTP service hosting the public API.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::services::manager::Service;
use crate::state::{AppState, ServiceStatus};
use crate::web::create_router;

pub struct WebService {
    port: u16,
    app_state: AppState,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self { port, app_state }
    }
}

#[async_trait]
impl Service for WebService {
    async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        let statuses = self.app_state.service_statuses.clone();
        let router = create_router(self.app_state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(addr = %addr, error = ?e, "failed to bind web server");
                statuses.set("web", ServiceStatus::Error);
                return;
            }
        };

        statuses.set("web", ServiceStatus::Active);
        info!(addr = %addr, "web server listening");

        let shutdown = async move {
            let _ = shutdown_rx.recv().await;
        };

        if let Err(e) = axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!(error = ?e, "web server error");
            statuses.set("web", ServiceStatus::Error);
        } else {
            statuses.set("web", ServiceStatus::Stopped);
        }
    }
}
