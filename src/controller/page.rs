use std::convert::TryFrom;

use serde::Serialize;
use thiserror::Error;

use crate::api::{ApiError, LeaderboardQuery};
use crate::constants::PAGE_SIZE;
use crate::controller::{RecordFetcher, ResolvedRecord, VerificationState};

#[derive(Error, Debug)]
pub enum PageError {
    #[error("invalid page request: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Network(#[from] ApiError),
}

/// One page of a track's leaderboard.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LeaderboardView {
    pub track_id: String,

    /// The 1-based page number.
    pub page: u32,

    /// The number of records that match the filter.
    pub total: u32,

    pub total_pages: u32,

    pub only_verified: bool,

    /// Up to `PAGE_SIZE` records, with ranks counted across all pages.
    pub records: Vec<ResolvedRecord>,

    /// The index of the given player's record in `records`, if it is on this page.
    pub highlight: Option<usize>,
}

/// The 1-based page that shows the record at a 1-based position.
pub fn page_of(position: u32) -> u32 {
    (position.max(1) - 1) / PAGE_SIZE + 1
}

/// The number of pages needed to show `total` records.
pub fn total_pages(total: u32) -> u32 {
    total / PAGE_SIZE + u32::from(total % PAGE_SIZE != 0)
}

/// The 1-based rank of the entry at `idx` of a slice starting after `skip` records.
fn rank_at(skip: u32, idx: usize) -> u32 {
    let idx = u32::try_from(idx).unwrap_or(u32::MAX);
    skip.saturating_add(idx).saturating_add(1)
}

impl RecordFetcher {
    /// Fetch a page of a track's leaderboard, and highlight the given
    /// player's record if it is on that page.
    pub async fn fetch_page(
        &self,
        track_id: &str,
        page: u32,
        only_verified: bool,
        player_id: Option<&str>,
    ) -> Result<LeaderboardView, PageError> {
        if track_id.trim().is_empty() {
            return Err(PageError::InvalidInput("empty track ID".to_string()));
        }
        if page == 0 {
            return Err(PageError::InvalidInput("pages start at 1".to_string()));
        }

        let skip = (page - 1).saturating_mul(PAGE_SIZE);
        let query = LeaderboardQuery {
            only_verified,
            ..LeaderboardQuery::slice(track_id, skip, PAGE_SIZE)
        };

        let (total, entries) = match self.api().leaderboard(&query).await {
            Ok(res) => (res.total, res.entries),
            Err(ApiError::NotFound) => (0, vec![]),
            Err(err) => return Err(err.into()),
        };

        let records: Vec<ResolvedRecord> = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let rank = rank_at(skip, idx);
                let verification = VerificationState::from_upstream(entry.verified_state);
                ResolvedRecord::new(entry, rank, total, verification, None)
            })
            .collect();

        let highlight =
            player_id.and_then(|id| records.iter().position(|r| r.player_id == id));

        log::debug!(
            "page {} of track {}: {} records of {}",
            page,
            track_id,
            records.len(),
            total
        );

        Ok(LeaderboardView {
            track_id: track_id.to_string(),
            page,
            total,
            total_pages: total_pages(total),
            only_verified,
            records,
            highlight,
        })
    }
}
