//! Shared row types for the data layer.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::data::unsigned::Count;

/// Lifecycle state of a scrape job ledger entry.
///
/// Transitions: `pending -> processing -> {completed, failed}`. A `failed`
/// entry re-enters `processing` when the executor retries; `completed` is
/// terminal and never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scrape_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored profile snapshot. Username is the sole external identity.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProfileRow {
    pub id: i32,
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub posts_count: Count,
    pub photos_count: Count,
    pub videos_count: Count,
    pub likes_count: Count,
    pub followers_count: Count,
    pub social_links: Option<Json<HashMap<String, String>>>,
    pub last_post_at: Option<DateTime<Utc>>,
    /// Set only after a successful fetch-and-commit cycle.
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TagRow {
    pub id: i32,
    pub name: String,
}

/// One scrape request's lifecycle record.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ScrapeJobRow {
    pub id: i32,
    pub username: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
