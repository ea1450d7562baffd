use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::*;

pub type Result<T> = std::result::Result<T, ApiError>;

/// The kinds of leaderboard requests the core makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Filtered by a player's hash.
    Player,
    /// Unfiltered slice of the leaderboard.
    Slice,
    /// Top verified record.
    WorldRecord,
    /// Basic profile by user token.
    User,
}

/// A scripted leaderboard service.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Maps track IDs to their records, sorted from better to worse.
    boards: HashMap<String, Vec<LeaderboardEntry>>,

    /// Maps user tokens to profiles.
    users: HashMap<String, UserProfile>,

    /// The number of remaining failures for a kind of request on a track.
    failures: HashMap<(String, CallKind), u32>,

    /// Tracks on which unfiltered slices return someone else's record.
    mismatched_slices: Vec<String>,

    /// Tracks whose responses cannot be parsed.
    malformed: Vec<String>,

    calls: HashMap<(String, CallKind), usize>,
}

/// Build a record, with `verified` mapped to the service's verified state.
pub fn entry(user_id: &str, name: &str, frames: u64, verified: bool) -> LeaderboardEntry {
    LeaderboardEntry {
        id: frames as i64,
        user_id: user_id.to_string(),
        name: name.to_string(),
        car_colors: "ff0000".to_string(),
        frames,
        verified_state: Some(if verified { 1 } else { 0 }),
        position: None,
    }
}

impl MockApi {
    pub fn new() -> Self {
        MockApi::default()
    }

    /// Add a track, with records in any order.
    pub fn with_board(self, track_id: &str, mut entries: Vec<LeaderboardEntry>) -> Self {
        entries.sort_by_key(|e| e.frames);
        self.state
            .lock()
            .unwrap()
            .boards
            .insert(track_id.to_string(), entries);
        self
    }

    pub fn with_user(self, token: &str, profile: UserProfile) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(token.to_string(), profile);
        self
    }

    /// Let the next `n` requests of this kind on this track fail with HTTP 503.
    pub fn fail_times(&self, track_id: &str, kind: CallKind, n: u32) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((track_id.to_string(), kind), n);
    }

    pub fn mismatch_slices(&self, track_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.mismatched_slices.push(track_id.to_string());
    }

    pub fn malformed(&self, track_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.malformed.push(track_id.to_string());
    }

    /// The number of requests of this kind that were made for a track.
    pub fn calls(&self, track_id: &str, kind: CallKind) -> usize {
        let state = self.state.lock().unwrap();
        *state
            .calls
            .get(&(track_id.to_string(), kind))
            .unwrap_or(&0)
    }

    fn kind_of(query: &LeaderboardQuery<'_>) -> CallKind {
        if query.user_token_hash.is_some() {
            CallKind::Player
        } else if query.only_verified {
            CallKind::WorldRecord
        } else {
            CallKind::Slice
        }
    }
}

impl MockState {
    fn count_and_fail(&mut self, key: (String, CallKind)) -> Result<()> {
        *self.calls.entry(key.clone()).or_insert(0) += 1;
        match self.failures.get_mut(&key) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(ApiError::Status(503))
            }
            _ => Ok(()),
        }
    }
}

fn with_position(entry: &LeaderboardEntry, idx: usize) -> LeaderboardEntry {
    LeaderboardEntry {
        position: Some(idx as u32 + 1),
        ..entry.clone()
    }
}

#[async_trait]
impl Calls for MockApi {
    async fn leaderboard(&self, query: &LeaderboardQuery<'_>) -> Result<LeaderboardPage> {
        let kind = MockApi::kind_of(query);
        let mut state = self.state.lock().unwrap();
        state.count_and_fail((query.track_id.to_string(), kind))?;

        if state.malformed.iter().any(|t| t == query.track_id) {
            return Err(serde_json::from_str::<LeaderboardPage>("{\"total\": -1}")
                .unwrap_err()
                .into());
        }

        let board = match state.boards.get(query.track_id) {
            Some(board) => board,
            None => return Err(ApiError::NotFound),
        };

        let ranked: Vec<(usize, &LeaderboardEntry)> = board
            .iter()
            .filter(|e| !query.only_verified || e.verified_state == Some(1))
            .enumerate()
            .collect();

        let entries = ranked
            .iter()
            .skip(query.skip as usize)
            .take(query.amount as usize)
            .map(|(idx, e)| with_position(e, *idx))
            .collect::<Vec<_>>();

        let entries = if kind == CallKind::Slice
            && state.mismatched_slices.iter().any(|t| t == query.track_id)
        {
            entries
                .into_iter()
                .map(|e| LeaderboardEntry {
                    user_id: "someone else".to_string(),
                    ..e
                })
                .collect()
        } else {
            entries
        };

        let user_entry = query.user_token_hash.and_then(|hash| {
            ranked
                .iter()
                .find(|(_, e)| e.user_id == hash)
                .map(|(idx, e)| LeaderboardEntry {
                    // the service omits the verified state here
                    verified_state: None,
                    ..with_position(e, *idx)
                })
        });

        Ok(LeaderboardPage {
            total: ranked.len() as u32,
            entries,
            user_entry,
        })
    }

    async fn user(&self, user_token: &str) -> Result<UserProfile> {
        let mut state = self.state.lock().unwrap();
        state.count_and_fail((user_token.to_string(), CallKind::User))?;
        state
            .users
            .get(user_token)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}
