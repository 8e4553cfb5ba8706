//! Scrape request intake and asynchronous job execution.
//!
//! `request_scrape` is the single entry point for both the web API and the
//! sweep scheduler. It coalesces duplicate requests against the ledger and
//! spawns the executor, which owns the retry loop and always terminates in a
//! ledger write — failures never escape the spawned task.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::time;
use tracing::{error, info, warn};

use crate::data::models::ProfileRow;
use crate::data::{profiles, scrape_jobs};
use crate::fans::ProfileFetcher;

/// Total attempts for one job, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Wall-clock budget for a single attempt (fetch + commit).
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// In-flight ledger entries untouched for longer than this no longer block
/// new requests. Covers the full retry budget (3 x 120s) with slack.
pub const IN_FLIGHT_STALE_AFTER: Duration = Duration::from_secs(15 * 60);

/// Upstream validation enforces this too; re-checked here defensively.
pub const MAX_USERNAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("username must be non-empty and at most {MAX_USERNAME_LEN} characters")]
    InvalidUsername,

    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// What `request_scrape` resolved to: a fresh job or an existing in-flight one.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScrapeRequestOutcome {
    pub job_id: i32,
    pub coalesced: bool,
}

enum AttemptOutcome {
    Committed(ProfileRow),
    /// The source reported the profile as unavailable — a terminal job
    /// failure that is not retried.
    NoData,
}

#[derive(Clone)]
pub struct ScrapeOrchestrator {
    db_pool: PgPool,
    fetcher: Arc<ProfileFetcher>,
}

impl ScrapeOrchestrator {
    pub fn new(db_pool: PgPool, fetcher: Arc<ProfileFetcher>) -> Self {
        Self { db_pool, fetcher }
    }

    pub fn validate_username(username: &str) -> Result<(), ScrapeError> {
        if username.trim().is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(ScrapeError::InvalidUsername);
        }
        Ok(())
    }

    /// Accept a scrape request for `username`.
    ///
    /// If a fresh non-terminal ledger entry already exists for the username,
    /// the request coalesces into it and no new work starts. Otherwise a
    /// `pending` entry is created and the executor is spawned; the caller
    /// polls the ledger for completion.
    pub async fn request_scrape(&self, username: &str) -> Result<ScrapeRequestOutcome, ScrapeError> {
        Self::validate_username(username)?;

        if let Some(existing) =
            scrape_jobs::find_in_flight(&self.db_pool, username, IN_FLIGHT_STALE_AFTER).await?
        {
            info!(
                username,
                job_id = existing.id,
                "scrape already in progress, coalescing"
            );
            return Ok(ScrapeRequestOutcome {
                job_id: existing.id,
                coalesced: true,
            });
        }

        let job = scrape_jobs::create_pending(&self.db_pool, username).await?;
        info!(username, job_id = job.id, "scrape job queued");

        let this = self.clone();
        let username = username.to_owned();
        let job_id = job.id;
        tokio::spawn(async move {
            this.execute(&username, job_id).await;
        });

        Ok(ScrapeRequestOutcome {
            job_id: job.id,
            coalesced: false,
        })
    }

    /// Run one scrape job to a terminal ledger state.
    ///
    /// Each attempt marks the entry `processing` (flipping a prior `failed`
    /// back), then fetches and commits under the attempt timeout. An expected
    /// absence fails the job immediately; unexpected errors and timeouts
    /// retry until the attempt budget is exhausted.
    pub async fn execute(&self, username: &str, job_id: i32) {
        for attempt in 1..=MAX_ATTEMPTS {
            if let Err(e) = scrape_jobs::mark_processing(&self.db_pool, job_id).await {
                error!(username, job_id, error = ?e, "failed to mark job processing");
                return;
            }

            match time::timeout(ATTEMPT_TIMEOUT, self.run_attempt(username)).await {
                Ok(Ok(AttemptOutcome::Committed(profile))) => {
                    if let Err(e) = scrape_jobs::mark_completed(&self.db_pool, job_id).await {
                        error!(username, job_id, error = ?e, "failed to mark job completed");
                        return;
                    }
                    info!(
                        username,
                        job_id,
                        likes_count = %profile.likes_count,
                        "profile scraped successfully"
                    );
                    return;
                }
                Ok(Ok(AttemptOutcome::NoData)) => {
                    warn!(username, job_id, "profile fetch returned no data");
                    self.finish_failed(username, job_id, "failed to fetch profile data")
                        .await;
                    return;
                }
                Ok(Err(e)) => {
                    self.record_attempt_failure(username, job_id, attempt, &format!("{e:#}"))
                        .await;
                }
                Err(_elapsed) => {
                    let message = format!(
                        "attempt timed out after {}s",
                        ATTEMPT_TIMEOUT.as_secs()
                    );
                    self.record_attempt_failure(username, job_id, attempt, &message)
                        .await;
                }
            }
        }
    }

    async fn run_attempt(&self, username: &str) -> anyhow::Result<AttemptOutcome> {
        let Some(data) = self.fetcher.fetch(username).await? else {
            return Ok(AttemptOutcome::NoData);
        };
        let profile = profiles::commit_snapshot(&self.db_pool, &data).await?;
        Ok(AttemptOutcome::Committed(profile))
    }

    /// Record a failed attempt on the ledger. The entry stays `failed` until
    /// the next attempt flips it back, or terminally if the budget is spent.
    async fn record_attempt_failure(
        &self,
        username: &str,
        job_id: i32,
        attempt: u32,
        message: &str,
    ) {
        let remaining = MAX_ATTEMPTS - attempt;
        if remaining > 0 {
            warn!(
                username,
                job_id,
                attempt,
                remaining_retries = remaining,
                error = message,
                "scrape attempt failed, will retry"
            );
        } else {
            error!(
                username,
                job_id,
                attempt,
                error = message,
                "scrape job failed permanently (attempt budget exhausted)"
            );
        }
        if let Err(e) = scrape_jobs::mark_failed(&self.db_pool, job_id, message).await {
            error!(username, job_id, error = ?e, "failed to record job failure");
        }
    }

    async fn finish_failed(&self, username: &str, job_id: i32, message: &str) {
        if let Err(e) = scrape_jobs::mark_failed(&self.db_pool, job_id, message).await {
            error!(username, job_id, error = ?e, "failed to record job failure");
        }
    }
}
