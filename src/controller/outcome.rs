use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};

use crate::api::{ApiError, LeaderboardEntry};
use crate::event::OutcomeDiff;
use crate::tracks::{TrackDescriptor, TrackRegistry};

/// Whether a record was checked by a verifier.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Unverified,
    Verified,
    /// The service did not tell us.
    Unknown,
}

impl VerificationState {
    pub fn from_upstream(state: Option<u8>) -> Self {
        match state {
            Some(0) => VerificationState::Unverified,
            Some(1) => VerificationState::Verified,
            _ => VerificationState::Unknown,
        }
    }
}

/// A player's record on a track, and how it compares to the others.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    /// The ID of the record's recording.
    pub id: i64,
    pub player_id: String,
    pub display_name: String,
    pub car_colors: String,
    pub time_ms: u64,
    pub verification: VerificationState,

    /// The 1-based position on the track's leaderboard.
    pub position: u32,

    /// Same as `position`.
    pub rank: u32,

    /// The number of records on the track.
    pub total: u32,

    /// `rank / total * 100`, lower is better.
    pub percentile: f64,

    /// The world record time this record was compared to, if known.
    pub wr_time_ms: Option<u64>,

    /// `time_ms - wr_time_ms`. Negative if this (unverified) record
    /// is faster than the verified world record.
    pub wr_time_gap_ms: Option<i64>,

    /// The gap as percentage of this record's time.
    pub wr_percent_gap: Option<f64>,
}

impl ResolvedRecord {
    /// Derive rank and gaps for a record at `position`, on a track
    /// with `total` records.
    pub fn new(
        entry: &LeaderboardEntry,
        position: u32,
        total: u32,
        verification: VerificationState,
        wr_time_ms: Option<u64>,
    ) -> Self {
        assert!(position >= 1, "positions start at 1");
        let total = total.max(position);
        let rank = position;
        let percentile = rank as f64 / total as f64 * 100.0;

        let wr_time_gap_ms = wr_time_ms.map(|wr| entry.frames as i64 - wr as i64);
        let wr_percent_gap = wr_time_gap_ms.map(|gap| {
            if entry.frames == 0 {
                0.0
            } else {
                gap as f64 / entry.frames as f64 * 100.0
            }
        });

        ResolvedRecord {
            id: entry.id,
            player_id: entry.user_id.clone(),
            display_name: entry.name.clone(),
            car_colors: entry.car_colors.clone(),
            time_ms: entry.frames,
            verification,
            position,
            rank,
            total,
            percentile,
            wr_time_ms,
            wr_time_gap_ms,
            wr_percent_gap,
        }
    }
}

/// The reason a track could not be fetched.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request failed, or the service responded with an error status.
    Network,
    /// The response was missing fields we rely on.
    DataShape,
}

impl From<&ApiError> for FailureKind {
    fn from(err: &ApiError) -> Self {
        if err.is_data_shape() {
            FailureKind::DataShape
        } else {
            FailureKind::Network
        }
    }
}

/// The result of looking up a player's record on a track.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state")]
pub enum FetchOutcome {
    Success(ResolvedRecord),

    /// The player has no record on this track.
    Absent,

    /// The lookup failed after repeating it `attempts` times.
    Failed {
        message: String,
        kind: FailureKind,
        attempts: u32,
        /// The number of re-attempts after the initial lookup.
        retry_count: u32,
    },

    /// A re-attempt is scheduled or running.
    Retrying { retry_count: u32 },
}

impl FetchOutcome {
    pub fn record(&self) -> Option<&ResolvedRecord> {
        match self {
            FetchOutcome::Success(record) => Some(record),
            _ => None,
        }
    }

    pub fn retry_count(&self) -> u32 {
        match self {
            FetchOutcome::Failed { retry_count, .. } | FetchOutcome::Retrying { retry_count } => {
                *retry_count
            }
            _ => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed { .. })
    }

    /// Returns `true` if the background sweep should re-attempt this track.
    pub fn is_retry_eligible(&self, max_retry_attempts: u32) -> bool {
        self.is_failed() && self.retry_count() < max_retry_attempts
    }

    /// Set the retry count of a failed outcome.
    pub fn with_retry_count(self, n: u32) -> Self {
        match self {
            FetchOutcome::Failed {
                message,
                kind,
                attempts,
                ..
            } => FetchOutcome::Failed {
                message,
                kind,
                attempts,
                retry_count: n,
            },
            other => other,
        }
    }
}

/// A failed track, as reported to callers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackFailure<'a> {
    pub track: &'a TrackDescriptor,
    pub message: &'a str,
    pub kind: FailureKind,
    pub retry_count: u32,

    /// `true` if the background sweep gave up on this track.
    pub permanent: bool,
}

/// A consistent copy of the outcome store.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct OutcomeSnapshot {
    pub generation: u64,
    pub player_id: Option<String>,

    /// Maps track IDs to outcomes. Tracks without an outcome
    /// have not been attempted yet.
    pub outcomes: HashMap<String, FetchOutcome>,

    /// Maps track IDs to their world record times, or `None`
    /// if there is none or it could not be fetched.
    pub wr_times: HashMap<String, Option<u64>>,
}

impl OutcomeSnapshot {
    pub fn get(&self, track_id: &str) -> Option<&FetchOutcome> {
        self.outcomes.get(track_id)
    }

    pub fn wr_time(&self, track_id: &str) -> Option<u64> {
        self.wr_times.get(track_id).copied().flatten()
    }

    /// Returns `true` if every track has an outcome, and none is being re-attempted.
    pub fn is_settled(&self, tracks: &TrackRegistry) -> bool {
        tracks.iter().all(|t| match self.outcomes.get(&t.id) {
            None | Some(FetchOutcome::Retrying { .. }) => false,
            Some(_) => true,
        })
    }

    /// Returns `true` if the background sweep will still re-attempt a track.
    pub fn has_pending_retries(&self, max_retry_attempts: u32) -> bool {
        self.outcomes.values().any(|o| match o {
            FetchOutcome::Retrying { .. } => true,
            o => o.is_retry_eligible(max_retry_attempts),
        })
    }

    /// Every failed track, in registry order.
    pub fn failures<'a>(
        &'a self,
        tracks: &'a TrackRegistry,
        max_retry_attempts: u32,
    ) -> Vec<TrackFailure<'a>> {
        tracks
            .iter()
            .filter_map(|track| match self.outcomes.get(&track.id) {
                Some(FetchOutcome::Failed {
                    message,
                    kind,
                    retry_count,
                    ..
                }) => Some(TrackFailure {
                    track,
                    message,
                    kind: *kind,
                    retry_count: *retry_count,
                    permanent: *retry_count >= max_retry_attempts,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Use to look up the outcomes of the current resolution.
#[async_trait]
pub trait LiveOutcomes: Send + Sync {
    /// While holding this guard, the state is read-only, and can be referenced.
    async fn lock(&self) -> RwLockReadGuard<'_, OutcomeSnapshot>;

    /// Copy the current state, f.e. to compute statistics without
    /// holding the lock.
    async fn snapshot(&self) -> OutcomeSnapshot {
        self.lock().await.clone()
    }

    /// The generation of the current resolution.
    async fn generation(&self) -> u64 {
        self.lock().await.generation
    }
}

const EVENT_CAPACITY: usize = 256;

/// The outcomes of the current resolution, keyed by track ID.
///
/// Writes are tagged with the generation of the resolution that made them,
/// and are discarded if a newer resolution has started since.
#[derive(Clone)]
pub struct OutcomeStore {
    state: Arc<RwLock<OutcomeSnapshot>>,
    events: broadcast::Sender<OutcomeDiff>,
}

impl Default for OutcomeStore {
    fn default() -> Self {
        OutcomeStore::new()
    }
}

impl OutcomeStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        OutcomeStore {
            state: Arc::new(RwLock::new(OutcomeSnapshot::default())),
            events,
        }
    }

    /// Receive every change to this store from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeDiff> {
        self.events.subscribe()
    }

    fn notify(&self, diff: OutcomeDiff) {
        // Fails only if there are no subscribers.
        let _ = self.events.send(diff);
    }

    /// Discard all outcomes and begin a new generation for the given player.
    pub async fn reset(&self, player_id: Option<&str>) -> u64 {
        let mut state = self.state.write().await;
        let generation = state.generation + 1;
        *state = OutcomeSnapshot {
            generation,
            player_id: player_id.map(str::to_string),
            ..OutcomeSnapshot::default()
        };
        self.notify(OutcomeDiff::Reset {
            generation,
            player_id: state.player_id.clone(),
        });
        generation
    }

    /// Store the outcome of a track. Returns `false` if the outcome
    /// belongs to a superseded resolution, and was discarded.
    pub async fn settle(&self, generation: u64, track_id: &str, outcome: FetchOutcome) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            log::debug!(
                "discard outcome for track {} of superseded resolution #{}",
                track_id,
                generation
            );
            return false;
        }
        state.outcomes.insert(track_id.to_string(), outcome.clone());
        self.notify(OutcomeDiff::Settled {
            generation,
            track_id: track_id.to_string(),
            outcome,
        });
        true
    }

    /// Remember the world record time of a track.
    pub async fn set_wr_time(&self, generation: u64, track_id: &str, wr_time_ms: Option<u64>) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }
        state.wr_times.insert(track_id.to_string(), wr_time_ms);
        true
    }

    /// Mark every failed track below the retry limit as `Retrying`,
    /// incrementing its retry count.
    ///
    /// Returns the marked tracks with their new retry count, or `None` if
    /// `generation` was superseded, or if there is no player to resolve.
    pub async fn begin_sweep(
        &self,
        generation: u64,
        max_retry_attempts: u32,
    ) -> Option<Vec<(String, u32)>> {
        let mut state = self.state.write().await;
        if state.generation != generation || state.player_id.is_none() {
            return None;
        }

        let mut marked: Vec<(String, u32)> = state
            .outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_retry_eligible(max_retry_attempts))
            .map(|(track_id, outcome)| (track_id.clone(), outcome.retry_count() + 1))
            .collect();
        marked.sort();

        for (track_id, retry_count) in &marked {
            let outcome = FetchOutcome::Retrying {
                retry_count: *retry_count,
            };
            state.outcomes.insert(track_id.clone(), outcome.clone());
            self.notify(OutcomeDiff::Settled {
                generation,
                track_id: track_id.clone(),
                outcome,
            });
        }
        Some(marked)
    }

    /// Mark a failed track as `Retrying`, regardless of how often it was
    /// re-attempted before. The retry count does not grow past the limit.
    ///
    /// Returns the current generation, player and the new retry count,
    /// or `None` if that track has not failed.
    pub async fn begin_manual_retry(
        &self,
        track_id: &str,
        max_retry_attempts: u32,
    ) -> Option<(u64, String, u32)> {
        let mut state = self.state.write().await;
        let player_id = state.player_id.clone()?;
        let retry_count = match state.outcomes.get(track_id) {
            Some(outcome @ FetchOutcome::Failed { .. }) => {
                (outcome.retry_count() + 1).min(max_retry_attempts)
            }
            _ => return None,
        };

        let generation = state.generation;
        let outcome = FetchOutcome::Retrying { retry_count };
        state.outcomes.insert(track_id.to_string(), outcome.clone());
        self.notify(OutcomeDiff::Settled {
            generation,
            track_id: track_id.to_string(),
            outcome,
        });
        Some((generation, player_id, retry_count))
    }

    /// Turn every `Retrying` track back into a failure that keeps its
    /// retry count, once its re-attempt was cancelled.
    ///
    /// Returns the affected tracks, or nothing if `generation` was superseded.
    pub async fn cancel_retries(&self, generation: u64) -> Vec<String> {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return Vec::new();
        }

        let mut cancelled: Vec<(String, u32)> = state
            .outcomes
            .iter()
            .filter_map(|(track_id, outcome)| match outcome {
                FetchOutcome::Retrying { retry_count } => Some((track_id.clone(), *retry_count)),
                _ => None,
            })
            .collect();
        cancelled.sort();

        for (track_id, retry_count) in &cancelled {
            let outcome = FetchOutcome::Failed {
                message: "re-attempt cancelled".to_string(),
                kind: FailureKind::Network,
                attempts: 0,
                retry_count: *retry_count,
            };
            state.outcomes.insert(track_id.clone(), outcome.clone());
            self.notify(OutcomeDiff::Settled {
                generation,
                track_id: track_id.clone(),
                outcome,
            });
        }
        cancelled.into_iter().map(|(track_id, _)| track_id).collect()
    }
}

#[async_trait]
impl LiveOutcomes for OutcomeStore {
    async fn lock(&self) -> RwLockReadGuard<'_, OutcomeSnapshot> {
        self.state.read().await
    }
}
