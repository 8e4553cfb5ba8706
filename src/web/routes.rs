//! Web API router construction.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::{profiles, status};

/// Creates the web server router.
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/profiles/search", get(profiles::search_profiles))
        .route("/profiles/scrape", post(profiles::request_scrape))
        .route("/profiles/scrape/{job_id}", get(profiles::scrape_status))
        .route("/profiles/{username}", get(profiles::get_profile))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        CompressionLayer::new()
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(Duration::from_secs(60)),
    ))
}
