//! Mock profile generator standing in for the live platform API.
//!
//! Produces random but realistic data so the full fetch/normalize/persist
//! pipeline can run without credentials. The generated payload goes through
//! the same envelope parsing as a live response.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use tracing::debug;

use crate::fans::client::ProfileSource;
use crate::fans::errors::FansApiError;
use crate::fans::models::{ProfileData, parse_envelope};

const FIRST_NAMES: &[&str] = &[
    "Emma", "Sophia", "Olivia", "Ava", "Isabella", "Mia", "Charlotte", "Amelia", "Harper",
    "Evelyn",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez",
];

const BIOS: &[&str] = &[
    "Content creator | Model | Fitness enthusiast. Living my best life. DM for collabs",
    "Actress | Dancer | Creator. Expressing myself through art. New content daily",
    "Lifestyle | Fashion | Travel. Exploring the world. Sharing my journey",
    "Artist | Photographer | Creator. Capturing moments. Making memories",
    "Model | Influencer | Entrepreneur. Building my empire. Living the dream",
];

const TAG_POOL: &[&str] = &[
    "fitness", "model", "fashion", "lifestyle", "travel", "photography", "art", "dance", "music",
    "food", "beauty", "makeup", "wellness", "yoga", "gym", "workout", "healthy", "motivation",
    "inspiration",
];

/// Generates a plausible profile for any username; never reports an absence.
#[derive(Debug, Default)]
pub struct MockFansClient;

impl MockFansClient {
    pub fn new() -> Self {
        Self
    }

    /// Build a raw response payload shaped like the live API's envelope.
    pub fn generate_response(username: &str) -> Value {
        let mut rng = rand::rng();

        let followers_count: i64 = rng.random_range(1_000..=1_000_000);
        let likes_count = followers_count * rng.random_range(2..=5);
        let posts_count: i64 = rng.random_range(50..=500);
        let photos_count = posts_count * rng.random_range(1..=3);
        let videos_count = posts_count * rng.random_range(1..=2);

        let name = format!(
            "{} {}",
            FIRST_NAMES.choose(&mut rng).unwrap(),
            LAST_NAMES.choose(&mut rng).unwrap()
        );

        let mut social_links = serde_json::Map::new();
        if rng.random_bool(0.5) {
            social_links.insert(
                "instagram".into(),
                json!(format!("https://instagram.com/{username}")),
            );
        }
        if rng.random_bool(0.5) {
            social_links.insert(
                "twitter".into(),
                json!(format!("https://twitter.com/{username}")),
            );
        }
        if rng.random_bool(0.5) {
            social_links.insert(
                "tiktok".into(),
                json!(format!("https://tiktok.com/@{username}")),
            );
        }

        let tag_count = rng.random_range(3..=6);
        let tags: Vec<&str> = TAG_POOL
            .choose_multiple(&mut rng, tag_count)
            .copied()
            .collect();

        let last_post_at = Utc::now() - Duration::hours(rng.random_range(1..=48));

        json!({
            "data": {
                "username": username,
                "name": name,
                "bio": BIOS.choose(&mut rng).unwrap(),
                "avatar_url": format!("https://ui-avatars.com/api/?name={username}&background=random"),
                "cover_url": "https://source.unsplash.com/random/1200x400/?fashion,model",
                "posts_count": posts_count,
                "photos_count": photos_count,
                "videos_count": videos_count,
                "likes_count": likes_count,
                "followers_count": followers_count,
                "social_links": social_links,
                "last_post_at": last_post_at.to_rfc3339(),
                "tags": tags,
                "is_verified": rng.random_bool(0.5),
            }
        })
    }
}

#[async_trait]
impl ProfileSource for MockFansClient {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, FansApiError> {
        debug!(username, "generating mock profile data");
        let response = Self::generate_response(username);
        let raw = parse_envelope(&response)?;
        Ok(ProfileData::from_raw(username, raw))
    }
}
