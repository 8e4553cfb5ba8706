//! Profile search, lookup, and scrape-job handlers.

use std::time::{Duration, Instant};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::models::{ProfileRow, ScrapeJobRow, TagRow};
use crate::data::{profiles, scrape_jobs};
use crate::scraper::ScrapeError;
use crate::state::AppState;
use crate::utils::log_if_slow;
use crate::web::error::{ApiError, ApiErrorCode, db_error};

const SEARCH_LIMIT: i32 = 50;
const SLOW_OP_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub profiles: Vec<ProfileRow>,
}

/// `GET /api/profiles/search?query=`
pub(super) async fn search_profiles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.query.trim();
    let len = query.chars().count();
    if !(2..=100).contains(&len) {
        return Err(ApiError::new(
            ApiErrorCode::InvalidQuery,
            "search query must be between 2 and 100 characters",
        ));
    }

    let start = Instant::now();
    let profiles = profiles::search(&state.db_pool, query, SEARCH_LIMIT)
        .await
        .map_err(|e| db_error("Profile search", e))?;
    log_if_slow(start, SLOW_OP_THRESHOLD, "profile search");

    info!(query, count = profiles.len(), "profile search completed");
    Ok(Json(SearchResponse {
        count: profiles.len(),
        profiles,
    }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileRow,
    pub tags: Vec<TagRow>,
}

/// `GET /api/profiles/{username}`
pub(super) async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Some((profile, tags)) = profiles::get_with_tags(&state.db_pool, &username)
        .await
        .map_err(|e| db_error("Profile lookup", e))?
    else {
        return Err(ApiError::not_found("profile not found"));
    };

    Ok(Json(ProfileResponse { profile, tags }))
}

#[derive(Deserialize)]
pub struct ScrapeRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct ScrapeQueuedResponse {
    pub job_id: i32,
    /// True when the request attached to an existing in-flight job.
    pub already_in_progress: bool,
}

/// `POST /api/profiles/scrape`
///
/// Returns 202 with the job id; polling `GET /api/profiles/scrape/{job_id}`
/// reveals the outcome.
pub(super) async fn request_scrape(
    State(state): State<AppState>,
    Json(body): Json<ScrapeRequest>,
) -> Result<(StatusCode, Json<ScrapeQueuedResponse>), ApiError> {
    match state.orchestrator.request_scrape(&body.username).await {
        Ok(outcome) => Ok((
            StatusCode::ACCEPTED,
            Json(ScrapeQueuedResponse {
                job_id: outcome.job_id,
                already_in_progress: outcome.coalesced,
            }),
        )),
        Err(e @ ScrapeError::InvalidUsername) => Err(ApiError::new(
            ApiErrorCode::InvalidUsername,
            e.to_string(),
        )),
        Err(ScrapeError::Db(e)) => Err(db_error("Scrape request", e)),
    }
}

/// `GET /api/profiles/scrape/{job_id}`
pub(super) async fn scrape_status(
    State(state): State<AppState>,
    Path(job_id): Path<i32>,
) -> Result<Json<ScrapeJobRow>, ApiError> {
    let Some(job) = scrape_jobs::get(&state.db_pool, job_id)
        .await
        .map_err(|e| db_error("Scrape status lookup", e))?
    else {
        return Err(ApiError::not_found("scrape job not found"));
    };

    Ok(Json(job))
}
