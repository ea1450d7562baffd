use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::controller::{FetchOutcome, OutcomeSnapshot, ResolvedRecord};
use crate::tracks::{Category, TrackDescriptor, TrackRegistry};

/// The orders in which tracks can be listed.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    TrackOrder,
    Percentile,
    Rank,
    Time,
    WrTimeGap,
    WrPercentGap,
    Alphabetical,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::TrackOrder
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SortKey::*;
        match s {
            "track-order" => Ok(TrackOrder),
            "percentile" => Ok(Percentile),
            "rank" => Ok(Rank),
            "time" => Ok(Time),
            "wr-time-gap" => Ok(WrTimeGap),
            "wr-percent-gap" => Ok(WrPercentGap),
            "alphabetical" => Ok(Alphabetical),
            _ => Err(format!(
                "unknown sort key '{}', expected one of: track-order, percentile, \
                 rank, time, wr-time-gap, wr-percent-gap, alphabetical",
                s
            )),
        }
    }
}

/// A track and whatever is known of the player's record on it.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackRow<'a> {
    /// The index of the track in the registry.
    pub index: usize,
    pub track: &'a TrackDescriptor,

    /// `None` if the track has not been attempted yet.
    pub outcome: Option<&'a FetchOutcome>,

    pub wr_time_ms: Option<u64>,
}

impl<'a> TrackRow<'a> {
    pub fn record(&self) -> Option<&'a ResolvedRecord> {
        self.outcome.and_then(FetchOutcome::record)
    }

    fn sort_value(&self, key: SortKey) -> Option<f64> {
        let record = self.record()?;
        match key {
            SortKey::Percentile => Some(record.percentile),
            SortKey::Rank => Some(record.rank as f64),
            SortKey::Time => Some(record.time_ms as f64),
            SortKey::WrTimeGap => record.wr_time_gap_ms.map(|g| g as f64),
            SortKey::WrPercentGap => record.wr_percent_gap,
            SortKey::TrackOrder | SortKey::Alphabetical => None,
        }
    }

    fn has_key(&self, key: SortKey) -> bool {
        match key {
            SortKey::TrackOrder | SortKey::Alphabetical => true,
            _ => self.sort_value(key).is_some(),
        }
    }
}

/// One row per track in registry order, optionally limited to a category.
pub fn track_rows<'a>(
    snapshot: &'a OutcomeSnapshot,
    tracks: &'a TrackRegistry,
    category: Option<Category>,
) -> Vec<TrackRow<'a>> {
    tracks
        .iter()
        .enumerate()
        .filter(|(_, track)| category.map_or(true, |c| track.category == c))
        .map(|(index, track)| TrackRow {
            index,
            track,
            outcome: snapshot.get(&track.id),
            wr_time_ms: snapshot.wr_time(&track.id),
        })
        .collect()
}

/// Sort rows in ascending order of the given key, or descending if `reverse` is set.
///
/// Rows without a value for the key are always listed last, in registry order.
pub fn sort_rows(rows: &mut Vec<TrackRow<'_>>, key: SortKey, reverse: bool) {
    let (mut keyed, mut missing): (Vec<_>, Vec<_>) =
        rows.drain(..).partition(|row| row.has_key(key));

    keyed.sort_by(|a, b| compare(a, b, key));
    if reverse {
        keyed.reverse();
    }
    missing.sort_by_key(|row| row.index);

    rows.extend(keyed);
    rows.extend(missing);
}

fn compare(a: &TrackRow<'_>, b: &TrackRow<'_>, key: SortKey) -> Ordering {
    let ord = match key {
        SortKey::TrackOrder => Ordering::Equal,
        SortKey::Alphabetical => a
            .track
            .name
            .to_lowercase()
            .cmp(&b.track.name.to_lowercase()),
        _ => {
            let (x, y) = (a.sort_value(key), b.sort_value(key));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    };
    ord.then(a.index.cmp(&b.index))
}
