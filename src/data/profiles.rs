//! Profile snapshot store: upsert-by-username commits with tag sync, plus
//! search and staleness queries for the sweep scheduler.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::data::models::{ProfileRow, TagRow};
use crate::fans::ProfileData;

/// Likes threshold separating the high-engagement sweep tier from the
/// regular tier.
pub const HIGH_ENGAGEMENT_LIKES: i32 = 100_000;

const PROFILE_COLUMNS: &str = "id, username, name, bio, avatar_url, cover_url, \
     posts_count, photos_count, videos_count, likes_count, followers_count, \
     social_links, last_post_at, last_scraped_at, is_verified, created_at, updated_at";

/// Persist a fetched snapshot, overwriting every scalar field (last-write-wins)
/// and replacing the tag association set with exactly the incoming tags.
///
/// Runs in one transaction: concurrent readers never observe a half-updated
/// profile or a partially-synced tag set. Stamps `last_scraped_at` to the
/// commit instant.
pub async fn commit_snapshot(pool: &PgPool, data: &ProfileData) -> Result<ProfileRow> {
    let mut tx = pool.begin().await.context("failed to begin commit transaction")?;

    let social_links = data.social_links.clone().map(Json);
    let profile = sqlx::query_as::<_, ProfileRow>(&format!(
        "INSERT INTO profiles (username, name, bio, avatar_url, cover_url, \
            posts_count, photos_count, videos_count, likes_count, followers_count, \
            social_links, last_post_at, last_scraped_at, is_verified) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now(), $13) \
         ON CONFLICT (username) DO UPDATE SET \
            name = EXCLUDED.name, \
            bio = EXCLUDED.bio, \
            avatar_url = EXCLUDED.avatar_url, \
            cover_url = EXCLUDED.cover_url, \
            posts_count = EXCLUDED.posts_count, \
            photos_count = EXCLUDED.photos_count, \
            videos_count = EXCLUDED.videos_count, \
            likes_count = EXCLUDED.likes_count, \
            followers_count = EXCLUDED.followers_count, \
            social_links = EXCLUDED.social_links, \
            last_post_at = EXCLUDED.last_post_at, \
            last_scraped_at = EXCLUDED.last_scraped_at, \
            is_verified = EXCLUDED.is_verified, \
            updated_at = now() \
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(&data.username)
    .bind(&data.name)
    .bind(&data.bio)
    .bind(&data.avatar_url)
    .bind(&data.cover_url)
    .bind(data.posts_count)
    .bind(data.photos_count)
    .bind(data.videos_count)
    .bind(data.likes_count)
    .bind(data.followers_count)
    .bind(social_links)
    .bind(data.last_post_at)
    .bind(data.is_verified)
    .fetch_one(&mut *tx)
    .await
    .context("failed to upsert profile")?;

    // Find-or-create each tag, then replace the association set. A full sync:
    // tags absent from the new data are detached, an empty list detaches all.
    let mut tag_ids: Vec<i32> = Vec::with_capacity(data.tags.len());
    for name in &data.tags {
        let tag_id: i32 = sqlx::query_scalar(
            "INSERT INTO tags (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to find-or-create tag '{name}'"))?;
        tag_ids.push(tag_id);
    }

    sqlx::query("DELETE FROM profile_tags WHERE profile_id = $1")
        .bind(profile.id)
        .execute(&mut *tx)
        .await
        .context("failed to detach old tags")?;

    if !tag_ids.is_empty() {
        sqlx::query(
            "INSERT INTO profile_tags (profile_id, tag_id) \
             SELECT $1, UNNEST($2::int[]) ON CONFLICT DO NOTHING",
        )
        .bind(profile.id)
        .bind(&tag_ids)
        .execute(&mut *tx)
        .await
        .context("failed to attach tags")?;
    }

    tx.commit().await.context("failed to commit profile snapshot")?;
    Ok(profile)
}

/// Fetch a profile and its tag set by username.
pub async fn get_with_tags(
    pool: &PgPool,
    username: &str,
) -> Result<Option<(ProfileRow, Vec<TagRow>)>> {
    let profile = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some(profile) = profile else {
        return Ok(None);
    };

    let tags = sqlx::query_as::<_, TagRow>(
        "SELECT t.id, t.name FROM tags t \
         JOIN profile_tags pt ON pt.tag_id = t.id \
         WHERE pt.profile_id = $1 ORDER BY t.id",
    )
    .bind(profile.id)
    .fetch_all(pool)
    .await?;

    Ok(Some((profile, tags)))
}

/// Case-insensitive substring search over username, name, and bio.
///
/// Most-liked profiles first; relevance ranking is out of scope.
pub async fn search(pool: &PgPool, query: &str, limit: i32) -> Result<Vec<ProfileRow>> {
    let pattern = format!("%{}%", escape_like(query));
    let profiles = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles \
         WHERE username ILIKE $1 OR name ILIKE $1 OR bio ILIKE $1 \
         ORDER BY likes_count DESC, username LIMIT $2"
    ))
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(profiles)
}

/// Usernames in the high-engagement tier whose snapshot is missing or older
/// than `cutoff`.
pub async fn find_stale_high_engagement(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>> {
    let usernames = sqlx::query_scalar(
        "SELECT username FROM profiles \
         WHERE likes_count >= $1 AND (last_scraped_at IS NULL OR last_scraped_at < $2)",
    )
    .bind(HIGH_ENGAGEMENT_LIKES)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(usernames)
}

/// Usernames below the high-engagement threshold whose snapshot is missing or
/// older than `cutoff`.
pub async fn find_stale_regular(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
    let usernames = sqlx::query_scalar(
        "SELECT username FROM profiles \
         WHERE likes_count < $1 AND (last_scraped_at IS NULL OR last_scraped_at < $2)",
    )
    .bind(HIGH_ENGAGEMENT_LIKES)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(usernames)
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
