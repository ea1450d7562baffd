use std::sync::Arc;

use thiserror::Error;
use tokio::time::sleep;

use crate::api::{ApiError, Calls, LeaderboardEntry, LeaderboardQuery};
use crate::config::RetryConfig;
use crate::controller::{FailureKind, FetchOutcome, ResolvedRecord, VerificationState};

#[derive(Error, Debug)]
enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unexpected response: {0}")]
    Shape(String),
}

impl FetchError {
    fn kind(&self) -> FailureKind {
        match self {
            FetchError::Api(err) => FailureKind::from(err),
            FetchError::Shape(_) => FailureKind::DataShape,
        }
    }
}

/// Looks up a player's records, one track at a time.
#[derive(Clone)]
pub struct RecordFetcher {
    api: Arc<dyn Calls>,
    retry: RetryConfig,
}

impl RecordFetcher {
    pub fn new(api: &Arc<dyn Calls>, retry: &RetryConfig) -> Self {
        RecordFetcher {
            api: api.clone(),
            retry: retry.clone(),
        }
    }

    pub(in crate::controller) fn api(&self) -> &Arc<dyn Calls> {
        &self.api
    }

    /// The time of the best verified record on a track.
    ///
    /// Returns `None` if the track has no verified records, or if the
    /// request failed. Statistics relative to the world record are
    /// then unknown, but the rest of the record is not affected.
    pub async fn world_record(&self, track_id: &str) -> Option<u64> {
        match self.api.leaderboard(&LeaderboardQuery::top_verified(track_id)).await {
            Ok(page) => page.entries.first().map(|e| e.frames),
            Err(ApiError::NotFound) => None,
            Err(err) => {
                log::warn!("failed to fetch world record of track {}: {}", track_id, err);
                None
            }
        }
    }

    /// Look up the player's record on a track, repeating the lookup
    /// with exponential backoff after errors.
    ///
    /// Never fails: errors are part of the returned outcome.
    pub async fn record(&self, player_id: &str, track_id: &str, wr_time_ms: Option<u64>) -> FetchOutcome {
        let max_attempts = self.retry.fetch_retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_record(player_id, track_id, wr_time_ms).await {
                Ok(Some(record)) => return FetchOutcome::Success(record),
                Ok(None) => return FetchOutcome::Absent,
                Err(err) if attempt >= max_attempts => {
                    log::error!(
                        "giving up on track {} after {} attempts: {}",
                        track_id,
                        attempt,
                        err
                    );
                    return FetchOutcome::Failed {
                        message: err.to_string(),
                        kind: err.kind(),
                        attempts: attempt,
                        retry_count: 0,
                    };
                }
                Err(err) => {
                    let delay = self.retry.backoff(attempt - 1);
                    log::warn!(
                        "attempt {}/{} on track {} failed, repeating in {:?}: {}",
                        attempt,
                        max_attempts,
                        track_id,
                        delay,
                        err
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn try_record(
        &self,
        player_id: &str,
        track_id: &str,
        wr_time_ms: Option<u64>,
    ) -> Result<Option<ResolvedRecord>, FetchError> {
        let query = LeaderboardQuery::player(track_id, player_id);
        let page = match self.api.leaderboard(&query).await {
            Ok(page) => page,
            Err(ApiError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let user_entry = match page.user_entry {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let position = match user_entry.position {
            Some(pos) if pos >= 1 => pos,
            other => {
                return Err(FetchError::Shape(format!(
                    "player entry on track {} has position {:?}",
                    track_id, other
                )))
            }
        };

        if page.total < position {
            log::warn!(
                "track {} reports {} records, but the player is at position {}",
                track_id,
                page.total,
                position
            );
        }

        let record = match self.full_entry(player_id, track_id, position).await {
            Some(full) => {
                let verification = VerificationState::from_upstream(full.verified_state);
                ResolvedRecord::new(&full, position, page.total, verification, wr_time_ms)
            }
            None => ResolvedRecord::new(
                &user_entry,
                position,
                page.total,
                VerificationState::Unknown,
                wr_time_ms,
            ),
        };
        Ok(Some(record))
    }

    /// The player's entry at its position in the unfiltered leaderboard,
    /// which, unlike the player-filtered entry, includes its verified state.
    ///
    /// Returns `None` if that request fails, or if the entry at that
    /// position belongs to someone else.
    async fn full_entry(&self, player_id: &str, track_id: &str, position: u32) -> Option<LeaderboardEntry> {
        let query = LeaderboardQuery::slice(track_id, position - 1, 1);
        match self.api.leaderboard(&query).await {
            Ok(page) => match page.entries.into_iter().next() {
                Some(entry) if entry.user_id == player_id => Some(entry),
                Some(_) => {
                    log::warn!(
                        "record at position {} on track {} belongs to someone else",
                        position,
                        track_id
                    );
                    None
                }
                None => {
                    log::warn!("no record at position {} on track {}", position, track_id);
                    None
                }
            },
            Err(err) => {
                log::warn!(
                    "failed to fetch verified state on track {}: {}",
                    track_id,
                    err
                );
                None
            }
        }
    }
}
