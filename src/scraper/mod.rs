//! Scrape job orchestration: request intake, the retrying executor, and the
//! scheduled staleness sweeps.

pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{ScrapeError, ScrapeOrchestrator, ScrapeRequestOutcome};
pub use scheduler::SweepScheduler;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::services::manager::Service;
use crate::state::{ServiceStatus, ServiceStatusRegistry};

/// Hosts the sweep scheduler as a managed service.
///
/// Job execution itself is not tied to this service: executor tasks are
/// spawned by the orchestrator whichever component accepted the request.
pub struct ScraperService {
    scheduler: SweepScheduler,
    statuses: ServiceStatusRegistry,
}

impl ScraperService {
    pub fn new(scheduler: SweepScheduler, statuses: ServiceStatusRegistry) -> Self {
        Self { scheduler, statuses }
    }
}

#[async_trait]
impl Service for ScraperService {
    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) {
        self.statuses.set("scraper", ServiceStatus::Active);
        self.scheduler.run(shutdown_rx).await;
        self.statuses.set("scraper", ServiceStatus::Stopped);
    }
}
