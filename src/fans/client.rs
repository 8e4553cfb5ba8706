//! Profile retrieval sources.
//!
//! [`ProfileSource`] is the seam between the fetch pipeline and the outside
//! world: the live HTTP client and the mock generator both implement it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::fans::errors::FansApiError;
use crate::fans::models::{ProfileData, parse_envelope};

/// Retrieves a single profile's public statistics from the platform.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, FansApiError>;
}

/// Live HTTP client for the platform profile API.
pub struct FansApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl FansApiClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FansApiError> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fanscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn profile_url(&self, username: &str) -> Result<Url, FansApiError> {
        Ok(self.base_url.join(&format!("profiles/{username}"))?)
    }
}

#[async_trait]
impl ProfileSource for FansApiClient {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, FansApiError> {
        let url = self.profile_url(username)?;
        debug!(username, url = %url, "fetching profile from platform API");

        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(FansApiError::NotFound {
                username: username.to_owned(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(FansApiError::RateLimited),
            status if !status.is_success() => Err(FansApiError::BadStatus {
                status: status.as_u16(),
                username: username.to_owned(),
            }),
            _ => {
                let body: Value = response.json().await?;
                let raw = parse_envelope(&body)?;
                Ok(ProfileData::from_raw(username, raw))
            }
        }
    }
}
