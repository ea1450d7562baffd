use crate::controller::FetchOutcome;

/// Changes to the outcome store that subscribers are notified of.
///
/// Every diff carries the generation of the resolution it belongs to,
/// so that subscribers can ignore diffs of superseded resolutions.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeDiff {
    /// Signals that a new resolution began, and all previous outcomes
    /// were discarded. `player_id` is `None` if the store was cleared.
    Reset {
        generation: u64,
        player_id: Option<String>,
    },

    /// Signals a new outcome for a track, either after it was fetched,
    /// or when a re-attempt was scheduled.
    Settled {
        generation: u64,
        track_id: String,
        outcome: FetchOutcome,
    },
}

impl OutcomeDiff {
    pub fn generation(&self) -> u64 {
        match self {
            OutcomeDiff::Reset { generation, .. } => *generation,
            OutcomeDiff::Settled { generation, .. } => *generation,
        }
    }
}
