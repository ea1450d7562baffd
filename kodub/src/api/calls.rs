use async_trait::async_trait;

use crate::api::*;
use crate::ApiError;

pub(in crate) type Result<T> = std::result::Result<T, ApiError>;

/// Read-only queries against the leaderboard service.
///
/// Every call is idempotent and can be repeated after a failure.
#[async_trait]
pub trait Calls: Send + Sync {
    /// Fetch a slice of a track's leaderboard.
    ///
    /// If the query contains a `user_token_hash`, the response's `user_entry`
    /// holds that player's record and their position, or `None` if they have
    /// not set a record on that track.
    ///
    /// Calls endpoint:
    ///     GET /leaderboard
    async fn leaderboard(&self, query: &LeaderboardQuery<'_>) -> Result<LeaderboardPage>;

    /// Fetch the basic profile that belongs to a secret user token.
    ///
    /// Calls endpoint:
    ///     GET /user
    async fn user(&self, user_token: &str) -> Result<UserProfile>;
}
