//! Application state shared across the web and scraper services.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;

use crate::scraper::ScrapeOrchestrator;

/// Health status of a service.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Stopped,
    Error,
}

#[derive(Debug, Clone)]
struct StatusEntry {
    status: ServiceStatus,
    #[allow(dead_code)]
    updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    /// Returns a snapshot of all service statuses.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status.clone()))
            .collect()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub orchestrator: Arc<ScrapeOrchestrator>,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(db_pool: PgPool, orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self {
            db_pool,
            orchestrator,
            service_statuses: ServiceStatusRegistry::new(),
        }
    }
}
