use indexmap::IndexMap;
use serde::Serialize;

use crate::controller::{OutcomeSnapshot, ResolvedRecord};
use crate::stats::{GapMedal, Medal, PercentileMedal, RankMedal};
use crate::tracks::{Category, TrackDescriptor, TrackRegistry};

/// A successfully resolved record, and the track it was set on.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackRecord<'a> {
    /// The index of the track in the registry.
    pub index: usize,
    pub track: &'a TrackDescriptor,
    pub record: &'a ResolvedRecord,
}

/// Averages over a set of records.
///
/// Every average only considers the records that have its value.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AggregateStats {
    /// The number of records.
    pub count: usize,
    pub avg_time_ms: f64,
    pub avg_rank: Option<f64>,
    pub avg_percentile: Option<f64>,
    pub avg_wr_time_gap_ms: Option<f64>,
    pub avg_wr_percent_gap: Option<f64>,
}

impl AggregateStats {
    /// Returns `None` if there are no records.
    pub fn compute(records: &[TrackRecord<'_>]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(AggregateStats {
            count: records.len(),
            avg_time_ms: mean(records.iter().map(|r| r.record.time_ms as f64)).unwrap_or(0.0),
            avg_rank: mean(records.iter().map(|r| r.record.rank as f64)),
            avg_percentile: mean(records.iter().map(|r| r.record.percentile)),
            avg_wr_time_gap_ms: mean(
                records
                    .iter()
                    .filter_map(|r| r.record.wr_time_gap_ms)
                    .map(|g| g as f64),
            ),
            avg_wr_percent_gap: mean(records.iter().filter_map(|r| r.record.wr_percent_gap)),
        })
    }

    pub fn percentile_medal(&self) -> Option<PercentileMedal> {
        self.avg_percentile.and_then(PercentileMedal::classify)
    }

    /// The rank medal of the rounded average rank.
    pub fn rank_medal(&self) -> Option<RankMedal> {
        self.avg_rank
            .and_then(|r| RankMedal::classify(r.round().max(0.0) as u32))
    }

    pub fn gap_medal(&self) -> Option<GapMedal> {
        self.avg_wr_percent_gap.and_then(GapMedal::classify)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// The best and worst record for some statistic.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Extremes<'a> {
    pub best: Option<TrackRecord<'a>>,
    pub worst: Option<TrackRecord<'a>>,
}

/// Best and worst records, where lower values are always better.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct BestWorst<'a> {
    pub time: Extremes<'a>,
    pub rank: Extremes<'a>,
    pub percentile: Extremes<'a>,
    pub wr_time_gap: Extremes<'a>,
    pub wr_percent_gap: Extremes<'a>,
}

impl<'a> BestWorst<'a> {
    pub fn compute(records: &[TrackRecord<'a>]) -> Self {
        BestWorst {
            time: extremes(records, |r| Some(r.time_ms as f64)),
            rank: extremes(records, |r| Some(r.rank as f64)),
            percentile: extremes(records, |r| Some(r.percentile)),
            wr_time_gap: extremes(records, |r| r.wr_time_gap_ms.map(|g| g as f64)),
            wr_percent_gap: extremes(records, |r| r.wr_percent_gap),
        }
    }
}

/// Ties keep the earlier record.
fn extremes<'a, F>(records: &[TrackRecord<'a>], key: F) -> Extremes<'a>
where
    F: Fn(&ResolvedRecord) -> Option<f64>,
{
    let mut best: Option<(f64, TrackRecord<'a>)> = None;
    let mut worst: Option<(f64, TrackRecord<'a>)> = None;

    for r in records {
        let value = match key(r.record) {
            Some(v) if !v.is_nan() => v,
            _ => continue,
        };
        match best {
            Some((b, _)) if value >= b => {}
            _ => best = Some((value, *r)),
        }
        match worst {
            Some((w, _)) if value <= w => {}
            _ => worst = Some((value, *r)),
        }
    }

    Extremes {
        best: best.map(|(_, r)| r),
        worst: worst.map(|(_, r)| r),
    }
}

/// Maps medal labels to the records that earned them, from best to worst medal.
pub type MedalGroups<'a> = IndexMap<&'static str, Vec<TrackRecord<'a>>>;

/// Every medal a single record earns, at most one per axis.
pub fn record_medals(record: &ResolvedRecord) -> Vec<Medal> {
    let mut medals = Vec::with_capacity(3);
    if let Some(m) = PercentileMedal::classify(record.percentile) {
        medals.push(m.into());
    }
    if let Some(m) = RankMedal::classify(record.rank) {
        medals.push(m.into());
    }
    if let Some(m) = record.wr_percent_gap.and_then(GapMedal::classify) {
        medals.push(m.into());
    }
    medals
}

/// Group records by medal. Medals that no record earned are left out.
pub fn medal_groups<'a>(records: &[TrackRecord<'a>]) -> MedalGroups<'a> {
    let earned: Vec<Vec<Medal>> = records.iter().map(|r| record_medals(r.record)).collect();

    Medal::all()
        .filter_map(|medal| {
            let holders: Vec<TrackRecord<'a>> = records
                .iter()
                .zip(&earned)
                .filter(|(_, medals)| medals.contains(&medal))
                .map(|(r, _)| *r)
                .collect();
            if holders.is_empty() {
                None
            } else {
                Some((medal.label(), holders))
            }
        })
        .collect()
}

/// Statistics for a subset of tracks.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryStats<'a> {
    /// The records in registry order.
    pub records: Vec<TrackRecord<'a>>,

    /// `None` if there are no records.
    pub averages: Option<AggregateStats>,

    pub best_worst: BestWorst<'a>,
    pub medals: MedalGroups<'a>,
}

impl<'a> CategoryStats<'a> {
    pub fn compute(records: Vec<TrackRecord<'a>>) -> Self {
        CategoryStats {
            averages: AggregateStats::compute(&records),
            best_worst: BestWorst::compute(&records),
            medals: medal_groups(&records),
            records,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Aggregate<'a> {
    pub overall: CategoryStats<'a>,
    pub by_category: IndexMap<Category, CategoryStats<'a>>,
}

/// Compute statistics from the successful outcomes of a resolution.
pub fn aggregate<'a>(outcomes: &'a OutcomeSnapshot, tracks: &'a TrackRegistry) -> Aggregate<'a> {
    let records: Vec<TrackRecord<'a>> = tracks
        .iter()
        .enumerate()
        .filter_map(|(index, track)| {
            let record = outcomes.get(&track.id)?.record()?;
            Some(TrackRecord {
                index,
                track,
                record,
            })
        })
        .collect();

    let mut by_category = IndexMap::new();
    for category in &[Category::Official, Category::Community] {
        let in_category = records
            .iter()
            .filter(|r| r.track.category == *category)
            .copied()
            .collect();
        by_category.insert(*category, CategoryStats::compute(in_category));
    }

    Aggregate {
        overall: CategoryStats::compute(records),
        by_category,
    }
}
