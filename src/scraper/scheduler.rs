//! Periodic sweeps that enqueue scrape jobs for stale profiles.
//!
//! Two independent daily tiers: high-engagement profiles (>= 100k likes,
//! re-scraped after 24 hours) and everything else (re-scraped after 72
//! hours, at a fixed early-morning time). Each tier skips a cycle entirely
//! while its previous run is still going, and relies on the orchestrator's
//! dedup for correctness under repeated invocation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use crate::data::{kv, profiles};
use crate::scraper::orchestrator::ScrapeOrchestrator;

/// How often the scheduler wakes up to check whether a sweep is due.
const WORK_INTERVAL: Duration = Duration::from_secs(60);

/// High-engagement profiles run once per day.
const HIGH_ENGAGEMENT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Snapshot age after which a high-engagement profile counts as stale.
const HIGH_ENGAGEMENT_MAX_AGE_HOURS: i64 = 24;

/// Snapshot age after which a regular profile counts as stale.
const REGULAR_MAX_AGE_HOURS: i64 = 72;

/// Fixed UTC hour at which the regular sweep runs.
const REGULAR_SWEEP_HOUR: u32 = 3;

// app_kv keys for persisting sweep timestamps across restarts.
pub const KV_HIGH_SWEEP: &str = "scheduler.high_engagement_sweep";
pub const KV_REGULAR_SWEEP: &str = "scheduler.regular_sweep";

/// Remaining cooldown from a persisted last-run timestamp.
///
/// Zero when the sweep has never run or the persisted time is older than
/// `interval`; otherwise the unelapsed part of the interval, so a restart
/// does not immediately redo recent work.
fn remaining_cooldown(persisted: Option<DateTime<Utc>>, interval: Duration) -> Duration {
    match persisted {
        None => Duration::ZERO,
        Some(ts) => {
            let elapsed = (Utc::now() - ts).to_std().unwrap_or(interval);
            interval.saturating_sub(elapsed)
        }
    }
}

/// Next occurrence of `hour`:00 UTC strictly after `last` (or after `now`
/// when the sweep has never run).
fn next_daily_run(last: Option<DateTime<Utc>>, now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let anchor = last.unwrap_or(now);
    let candidate = anchor
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("valid wall-clock hour")
        .and_utc();
    if candidate > anchor {
        candidate
    } else {
        candidate + chrono::Duration::days(1)
    }
}

/// Periodically enumerates stale profiles and requests scrapes for them.
pub struct SweepScheduler {
    db_pool: PgPool,
    orchestrator: Arc<ScrapeOrchestrator>,
}

impl SweepScheduler {
    pub fn new(db_pool: PgPool, orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self {
            db_pool,
            orchestrator,
        }
    }

    /// Runs the scheduler loop until a shutdown signal arrives.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("sweep scheduler started");

        let persisted_high = kv::get_timestamp(&self.db_pool, KV_HIGH_SWEEP)
            .await
            .unwrap_or(None);
        let mut last_regular = kv::get_timestamp(&self.db_pool, KV_REGULAR_SWEEP)
            .await
            .unwrap_or(None);

        if persisted_high.is_some() || last_regular.is_some() {
            info!(
                last_high_sweep = ?persisted_high,
                last_regular_sweep = ?last_regular,
                "loaded persisted sweep timestamps"
            );
        }

        let mut next_high_due =
            time::Instant::now() + remaining_cooldown(persisted_high, HIGH_ENGAGEMENT_INTERVAL);
        let mut high_work: Option<JoinHandle<()>> = None;
        let mut regular_work: Option<JoinHandle<()>> = None;
        let mut next_check = time::Instant::now();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("sweep scheduler received shutdown signal, exiting");
                    break;
                }
                _ = time::sleep_until(next_check) => {
                    next_check = time::Instant::now() + WORK_INTERVAL;

                    if time::Instant::now() >= next_high_due {
                        let busy = high_work.as_ref().is_some_and(|handle| !handle.is_finished());
                        if busy {
                            warn!("previous high-engagement sweep still running, skipping this run");
                        } else {
                            next_high_due = time::Instant::now() + HIGH_ENGAGEMENT_INTERVAL;
                            let pool = self.db_pool.clone();
                            let orchestrator = self.orchestrator.clone();
                            high_work = Some(tokio::spawn(async move {
                                run_high_engagement_sweep(&pool, &orchestrator).await;
                            }));
                        }
                    }

                    let now = Utc::now();
                    if now >= next_daily_run(last_regular, now, REGULAR_SWEEP_HOUR) {
                        let busy = regular_work.as_ref().is_some_and(|handle| !handle.is_finished());
                        if busy {
                            warn!("previous regular sweep still running, skipping this run");
                        } else {
                            last_regular = Some(now);
                            let pool = self.db_pool.clone();
                            let orchestrator = self.orchestrator.clone();
                            regular_work = Some(tokio::spawn(async move {
                                run_regular_sweep(&pool, &orchestrator).await;
                            }));
                        }
                    }
                }
            }
        }
    }
}

/// Enqueue scrapes for stale high-engagement profiles.
pub async fn run_high_engagement_sweep(pool: &PgPool, orchestrator: &ScrapeOrchestrator) {
    let cutoff = Utc::now() - chrono::Duration::hours(HIGH_ENGAGEMENT_MAX_AGE_HOURS);
    match profiles::find_stale_high_engagement(pool, cutoff).await {
        Ok(usernames) => {
            info!(
                count = usernames.len(),
                "high-engagement sweep found stale profiles"
            );
            enqueue_all(pool, orchestrator, usernames, KV_HIGH_SWEEP, "high-engagement").await;
        }
        Err(e) => error!(error = ?e, "high-engagement sweep query failed"),
    }
}

/// Enqueue scrapes for stale regular-tier profiles.
pub async fn run_regular_sweep(pool: &PgPool, orchestrator: &ScrapeOrchestrator) {
    let cutoff = Utc::now() - chrono::Duration::hours(REGULAR_MAX_AGE_HOURS);
    match profiles::find_stale_regular(pool, cutoff).await {
        Ok(usernames) => {
            info!(count = usernames.len(), "regular sweep found stale profiles");
            enqueue_all(pool, orchestrator, usernames, KV_REGULAR_SWEEP, "regular").await;
        }
        Err(e) => error!(error = ?e, "regular sweep query failed"),
    }
}

async fn enqueue_all(
    pool: &PgPool,
    orchestrator: &ScrapeOrchestrator,
    usernames: Vec<String>,
    kv_key: &str,
    tier: &str,
) {
    let mut queued = 0usize;
    let mut coalesced = 0usize;
    for username in usernames {
        match orchestrator.request_scrape(&username).await {
            Ok(outcome) if outcome.coalesced => coalesced += 1,
            Ok(_) => queued += 1,
            Err(e) => warn!(username = %username, error = ?e, "failed to queue sweep scrape"),
        }
    }
    info!(tier, queued, coalesced, "sweep complete");

    if let Err(e) = kv::set_timestamp(pool, kv_key, Utc::now()).await {
        warn!(tier, error = ?e, "failed to persist sweep timestamp");
    }
}
