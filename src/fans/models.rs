//! Wire types for the platform profile API and the canonical fetch result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::data::unsigned::Count;

/// A profile as it appears on the wire. Every field is optional; unknown
/// fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub photos_count: i64,
    #[serde(default)]
    pub videos_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub social_links: Option<HashMap<String, String>>,
    /// RFC 3339 timestamp of the most recent post.
    #[serde(default)]
    pub last_post_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// Unwrap the response envelope: most endpoints nest the profile under a
/// `data` key, but some return it at the top level.
pub fn parse_envelope(value: &Value) -> Result<RawProfile, serde_json::Error> {
    let inner = value.get("data").unwrap_or(value);
    RawProfile::deserialize(inner)
}

/// The normalized, pre-persistence representation of a fetched profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileData {
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
    pub social_links: Option<HashMap<String, String>>,
    pub last_post_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub is_verified: bool,
}

impl ProfileData {
    /// Normalize a raw response into the canonical shape.
    ///
    /// Negative counters clamp to 0, an unparseable `last_post_at` becomes
    /// unset rather than an error.
    pub fn from_raw(username: &str, raw: RawProfile) -> Self {
        let last_post_at = raw
            .last_post_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.to_utc());

        Self {
            username: username.to_owned(),
            name: raw.name,
            bio: raw.bio,
            avatar_url: raw.avatar_url,
            cover_url: raw.cover_url,
            posts_count: Count::saturating_from(raw.posts_count),
            photos_count: Count::saturating_from(raw.photos_count),
            videos_count: Count::saturating_from(raw.videos_count),
            likes_count: Count::saturating_from(raw.likes_count),
            followers_count: Count::saturating_from(raw.followers_count),
            social_links: raw.social_links,
            last_post_at,
            tags: raw.tags,
            is_verified: raw.is_verified,
        }
    }
}
