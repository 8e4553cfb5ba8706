//! Process signal handling and coordinated shutdown.

use std::process::ExitCode;
use std::time::Duration;

use tracing::info;

use crate::services::manager::ServiceManager;

/// Block until SIGINT/SIGTERM, then stop all services gracefully.
pub async fn handle_shutdown_signals(manager: ServiceManager, shutdown_timeout: u64) -> ExitCode {
    wait_for_signal().await;

    info!(
        timeout_secs = shutdown_timeout,
        "shutdown signal received, stopping services"
    );

    if manager.shutdown(Duration::from_secs(shutdown_timeout)).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
