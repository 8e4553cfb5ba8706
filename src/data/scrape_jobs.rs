//! Ledger queries for scrape job lifecycle tracking.
//!
//! Every transition writes through immediately; status queries always see the
//! latest state. The at-most-one-in-flight guarantee per username is enforced
//! by the orchestrator's [`find_in_flight`] check, not by a table constraint,
//! so the table keeps full history (multiple terminal entries per username).

use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;

use crate::data::models::ScrapeJobRow;

const JOB_SELECT: &str =
    "SELECT id, username, status, error_message, created_at, updated_at FROM scrape_jobs";

/// Insert a new ledger entry in `pending` state.
pub async fn create_pending(pool: &PgPool, username: &str) -> Result<ScrapeJobRow> {
    let job = sqlx::query_as::<_, ScrapeJobRow>(
        "INSERT INTO scrape_jobs (username, status) VALUES ($1, 'pending') \
         RETURNING id, username, status, error_message, created_at, updated_at",
    )
    .bind(username)
    .fetch_one(pool)
    .await?;
    Ok(job)
}

/// Find a non-terminal ledger entry for `username` that is still fresh.
///
/// Entries untouched for longer than `stale_after` are ignored: a job stuck
/// past its whole retry budget must not block new requests indefinitely.
pub async fn find_in_flight(
    pool: &PgPool,
    username: &str,
    stale_after: Duration,
) -> Result<Option<ScrapeJobRow>> {
    let job = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "{JOB_SELECT} \
         WHERE username = $1 \
           AND status IN ('pending', 'processing') \
           AND updated_at > now() - $2::interval \
         ORDER BY id DESC LIMIT 1"
    ))
    .bind(username)
    .bind(format!("{} seconds", stale_after.as_secs()))
    .fetch_optional(pool)
    .await?;
    Ok(job)
}

/// Fetch a ledger entry by id, or `None` for an unknown id.
pub async fn get(pool: &PgPool, job_id: i32) -> Result<Option<ScrapeJobRow>> {
    let job = sqlx::query_as::<_, ScrapeJobRow>(&format!("{JOB_SELECT} WHERE id = $1"))
        .bind(job_id)
        .fetch_optional(pool)
        .await?;
    Ok(job)
}

/// Mark an entry `processing`. Also flips a `failed` entry back when the
/// executor starts a retry attempt.
pub async fn mark_processing(pool: &PgPool, job_id: i32) -> Result<()> {
    sqlx::query("UPDATE scrape_jobs SET status = 'processing', updated_at = now() WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark an entry terminally `completed`.
pub async fn mark_completed(pool: &PgPool, job_id: i32) -> Result<()> {
    sqlx::query("UPDATE scrape_jobs SET status = 'completed', updated_at = now() WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark an entry `failed` with a descriptive message.
///
/// Overwrites any prior attempt's message; a later retry attempt flips the
/// entry back to `processing`.
pub async fn mark_failed(pool: &PgPool, job_id: i32, error_message: &str) -> Result<()> {
    sqlx::query(
        "UPDATE scrape_jobs SET status = 'failed', error_message = $2, updated_at = now() \
         WHERE id = $1",
    )
    .bind(job_id)
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}
