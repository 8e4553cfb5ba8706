//! Short-lived cache of fetched profile data, keyed by username.
//!
//! Purely an optimization to avoid redundant external calls; a miss never
//! blocks correctness. Reads are concurrent, a write to the same key simply
//! replaces the prior value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::fans::models::ProfileData;

/// How long a fetched profile stays usable without a new external call.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry {
    data: ProfileData,
    expires_at: Instant,
}

/// Process-wide fetch cache, shared by all orchestrator tasks.
#[derive(Clone, Default)]
pub struct FetchCache {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached profile for `username` if still fresh.
    ///
    /// Expired entries are evicted on access rather than by a background task.
    pub fn get(&self, username: &str) -> Option<ProfileData> {
        let entry = self.inner.get(username)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.inner.remove(username);
            return None;
        }
        Some(entry.data.clone())
    }

    /// Cache a fetched profile for the default TTL.
    pub fn insert(&self, data: ProfileData) {
        self.insert_with_ttl(data, CACHE_TTL);
    }

    pub fn insert_with_ttl(&self, data: ProfileData, ttl: Duration) {
        self.inner.insert(
            data.username.clone(),
            CacheEntry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::unsigned::Count;

    fn sample(username: &str, likes: u32) -> ProfileData {
        ProfileData {
            username: username.to_owned(),
            name: None,
            bio: None,
            avatar_url: None,
            cover_url: None,
            posts_count: Count::default(),
            photos_count: Count::default(),
            videos_count: Count::default(),
            likes_count: Count::new(likes),
            followers_count: Count::default(),
            social_links: None,
            last_post_at: None,
            tags: vec![],
            is_verified: false,
        }
    }

    #[test]
    fn hit_returns_fresh_entry() {
        let cache = FetchCache::new();
        cache.insert(sample("alice", 10));
        assert_eq!(cache.get("alice").unwrap().likes_count.get(), 10);
        assert!(cache.get("bob").is_none());
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = FetchCache::new();
        cache.insert_with_ttl(sample("alice", 10), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("alice").is_none());
    }

    #[test]
    fn same_key_write_replaces() {
        let cache = FetchCache::new();
        cache.insert(sample("alice", 10));
        cache.insert(sample("alice", 99));
        assert_eq!(cache.get("alice").unwrap().likes_count.get(), 99);
    }
}
