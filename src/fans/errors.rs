use thiserror::Error;

/// Failure modes of a profile fetch against the platform API.
#[derive(Debug, Error)]
pub enum FansApiError {
    #[error("profile '{username}' does not exist")]
    NotFound { username: String },

    #[error("rate limited by the platform API")]
    RateLimited,

    #[error("profile request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status} fetching profile '{username}'")]
    BadStatus { status: u16, username: String },

    #[error("failed to decode profile response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid platform base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl FansApiError {
    /// Whether the source signalled an expected absence (as opposed to a
    /// transport or decoding fault worth retrying).
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            FansApiError::NotFound { .. } | FansApiError::RateLimited
        )
    }
}
