//! Transition duration aggregation
//!
//! For each classified candidate the aggregator picks a start anchor and an end
//! anchor, takes the whole-day difference, and averages the samples over all
//! candidates and over the engaged subset.
//!
//! Anchors:
//! - start: earliest activity satisfying the from-side; for `Any` it is the
//!   candidate's earliest activity overall (funnel entry)
//! - end: latest activity satisfying the to-side
//!
//! A candidate whose end anchor precedes its start anchor, or who lacks either
//! anchor, contributes no sample.

use crate::error::FunnelError;
use crate::timeline::{CandidateIndex, CandidateTimeline};
use crate::types::FolderSpec;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Duration statistics for one transition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationSummary {
    /// Mean whole-day duration over all samples
    pub overall_avg: Option<f64>,
    /// Mean restricted to engaged candidates
    pub engaged_avg: Option<f64>,
    /// Classified candidates that are unengaged
    pub unengaged_count: usize,
    /// Candidates that produced a sample
    pub samples: usize,
}

/// Aggregator over a shared candidate index and unengaged set
pub struct DurationAggregator<'a> {
    index: &'a CandidateIndex,
    unengaged: &'a HashSet<String>,
}

impl<'a> DurationAggregator<'a> {
    pub fn new(index: &'a CandidateIndex, unengaged: &'a HashSet<String>) -> Self {
        Self { index, unengaged }
    }

    /// Aggregate durations for the candidates classified under `from → to`
    pub fn aggregate(
        &self,
        candidate_ids: &HashSet<String>,
        from: &FolderSpec,
        to: &FolderSpec,
    ) -> Result<DurationSummary, FunnelError> {
        let mut total_days: i64 = 0;
        let mut samples: usize = 0;
        let mut engaged_days: i64 = 0;
        let mut engaged_samples: usize = 0;
        let mut unengaged_count = 0;

        for candidate_id in candidate_ids {
            let timeline = self.index.get(candidate_id).ok_or_else(|| {
                FunnelError::InconsistentIndex(format!(
                    "classified candidate {} has no timeline",
                    candidate_id
                ))
            })?;

            let is_unengaged = self.unengaged.contains(candidate_id);
            if is_unengaged {
                unengaged_count += 1;
            }

            if let Some(days) = duration_days(timeline, from, to) {
                total_days += days;
                samples += 1;
                if !is_unengaged {
                    engaged_days += days;
                    engaged_samples += 1;
                }
            }
        }

        Ok(DurationSummary {
            overall_avg: mean(total_days, samples),
            engaged_avg: mean(engaged_days, engaged_samples),
            unengaged_count,
            samples,
        })
    }
}

/// Start anchor for a candidate under the given from-side
pub fn anchor_from(timeline: &CandidateTimeline, from: &FolderSpec) -> Option<DateTime<Utc>> {
    match from {
        FolderSpec::Any => timeline.first_activity(),
        _ => timeline
            .timed_events()
            .iter()
            .find(|e| from.matches_from(&e.from_folder))
            .and_then(|e| e.activity_time),
    }
}

/// End anchor for a candidate under the given to-side
pub fn anchor_to(timeline: &CandidateTimeline, to: &FolderSpec) -> Option<DateTime<Utc>> {
    timeline
        .timed_events()
        .iter()
        .rev()
        .find(|e| to.matches_to(&e.to_folder))
        .and_then(|e| e.activity_time)
}

/// Whole days between the anchors, truncated toward zero; `None` when an anchor
/// is missing or the end precedes the start
pub fn duration_days(timeline: &CandidateTimeline, from: &FolderSpec, to: &FolderSpec) -> Option<i64> {
    let start = anchor_from(timeline, from)?;
    let end = anchor_to(timeline, to)?;
    if end < start {
        return None;
    }
    Some((end - start).num_days())
}

fn mean(total: i64, count: usize) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(total as f64 / count as f64)
    }
}
