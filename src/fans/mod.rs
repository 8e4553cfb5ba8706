//! Client layer for the creator-platform profile API: sources, normalization,
//! and the short-lived fetch cache.

pub mod cache;
pub mod client;
pub mod errors;
pub mod mock;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;

pub use cache::FetchCache;
pub use client::{FansApiClient, ProfileSource};
pub use errors::FansApiError;
pub use mock::MockFansClient;
pub use models::ProfileData;

/// Fetches profile data through the cache, normalizing source responses.
///
/// Shared by all orchestrator tasks; the cache is the only mutable state and
/// is internally synchronized.
pub struct ProfileFetcher {
    source: Arc<dyn ProfileSource>,
    cache: FetchCache,
}

impl ProfileFetcher {
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            source,
            cache: FetchCache::new(),
        }
    }

    /// Build the fetcher from config: the live client when a base URL is
    /// configured, the mock generator otherwise.
    pub fn from_config(config: &Config) -> Result<Self, FansApiError> {
        let source: Arc<dyn ProfileSource> = match &config.fans_base_url {
            Some(base_url) => {
                info!(base_url, "using live platform API for profile data");
                Arc::new(FansApiClient::new(
                    base_url,
                    config.fans_api_token.clone(),
                    Duration::from_secs(config.fans_request_timeout),
                )?)
            }
            None => {
                info!("no platform base URL configured, using mock profile data");
                Arc::new(MockFansClient::new())
            }
        };
        Ok(Self::new(source))
    }

    /// Fetch a profile's public statistics.
    ///
    /// `Ok(None)` means the source reported an expected absence (not found or
    /// rate limited) — a job failure, not a fault. `Err` means a transport or
    /// decoding problem worth retrying.
    pub async fn fetch(&self, username: &str) -> Result<Option<ProfileData>, FansApiError> {
        if let Some(hit) = self.cache.get(username) {
            debug!(username, "using cached profile data");
            return Ok(Some(hit));
        }

        match self.source.fetch_profile(username).await {
            Ok(data) => {
                self.cache.insert(data.clone());
                Ok(Some(data))
            }
            Err(e) if e.is_absence() => {
                warn!(username, reason = %e, "profile data unavailable");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
