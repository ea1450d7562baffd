use thiserror::Error;

/// Possible errors when querying the leaderboard service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The service has nothing for this query, f.e. no records on a track yet.
    #[error("no such resource (HTTP 404)")]
    NotFound,

    /// The service responded with an unexpected status, f.e. when
    /// it is rate limiting requests.
    #[error("API responded with HTTP {0}")]
    Status(u16),

    /// Wrong endpoint, or maybe not available right now.
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// The response is missing fields we rely on.
    #[error("failed to parse API response: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// Returns `true` if the response arrived, but did not have the expected shape.
    pub fn is_data_shape(&self) -> bool {
        matches!(self, ApiError::ParseError(_))
    }
}
