use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use figment::{Figment, providers::Env};
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::cli::ServiceName;
use crate::config::Config;
use crate::fans::ProfileFetcher;
use crate::scraper::{ScrapeOrchestrator, ScraperService, SweepScheduler};
use crate::services::manager::ServiceManager;
use crate::services::web::WebService;
use crate::state::AppState;

/// Main application struct containing all shared components.
pub struct App {
    config: Config,
    db_pool: sqlx::PgPool,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    /// Create a new App instance with all components initialized.
    pub async fn new() -> Result<Self, anyhow::Error> {
        let config: Config = Figment::new()
            .merge(Env::raw())
            .extract()
            .context("Failed to load config")?;

        let connect_options = sqlx::postgres::PgConnectOptions::from_str(&config.database_url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            max_connections = 8,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            "database pool established"
        );

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed");

        let fetcher = Arc::new(
            ProfileFetcher::from_config(&config).context("Failed to create profile fetcher")?,
        );
        let orchestrator = Arc::new(ScrapeOrchestrator::new(db_pool.clone(), fetcher));
        let app_state = AppState::new(db_pool.clone(), orchestrator);

        Ok(App {
            config,
            db_pool,
            app_state,
            service_manager: ServiceManager::new(),
        })
    }

    /// Register services based on the enabled service list.
    pub fn setup_services(&mut self, services: &[ServiceName]) -> Result<(), anyhow::Error> {
        if services.contains(&ServiceName::Web) {
            let web_service = Box::new(WebService::new(self.config.port, self.app_state.clone()));
            self.service_manager
                .register_service(ServiceName::Web.as_str(), web_service);
        }

        if services.contains(&ServiceName::Scraper) {
            let scheduler =
                SweepScheduler::new(self.db_pool.clone(), self.app_state.orchestrator.clone());
            let scraper_service = Box::new(ScraperService::new(
                scheduler,
                self.app_state.service_statuses.clone(),
            ));
            self.service_manager
                .register_service(ServiceName::Scraper.as_str(), scraper_service);
        }

        if !self.service_manager.has_services() {
            anyhow::bail!("No services enabled");
        }

        Ok(())
    }

    /// Start all registered services.
    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run(self) -> ExitCode {
        use crate::services::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await
    }
}
