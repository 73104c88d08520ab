//! Engagement detection
//!
//! A candidate is unengaged when two consecutive activities are further apart
//! than the gap threshold. The classification is independent of any transition.

use crate::timeline::{CandidateIndex, CandidateTimeline};
use chrono::Duration;
use std::collections::HashSet;

/// Default maximum gap between consecutive activities (days)
pub const DEFAULT_ENGAGEMENT_GAP_DAYS: i64 = 7;

/// Detector for candidates with long activity gaps
#[derive(Debug, Clone, Copy)]
pub struct EngagementDetector {
    max_gap: Duration,
}

impl Default for EngagementDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ENGAGEMENT_GAP_DAYS)
    }
}

impl EngagementDetector {
    /// Create a detector that flags gaps strictly longer than `gap_days`.
    ///
    /// Thresholds beyond the representable range never flag anyone.
    pub fn new(gap_days: i64) -> Self {
        Self {
            max_gap: Duration::try_days(gap_days).unwrap_or(Duration::MAX),
        }
    }

    pub fn gap_days(&self) -> i64 {
        self.max_gap.num_days()
    }

    /// Whether any two adjacent timed activities are more than the threshold apart.
    ///
    /// Candidates with fewer than two timed activities are never flagged.
    pub fn is_unengaged(&self, timeline: &CandidateTimeline) -> bool {
        timeline.timed_events().windows(2).any(|pair| {
            match (pair[0].activity_time, pair[1].activity_time) {
                (Some(earlier), Some(later)) => later - earlier > self.max_gap,
                _ => false,
            }
        })
    }

    /// Ids of every unengaged candidate in the population
    pub fn unengaged(&self, index: &CandidateIndex) -> HashSet<String> {
        index
            .iter()
            .filter(|timeline| self.is_unengaged(timeline))
            .map(|timeline| timeline.candidate_id().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 1, d, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_ten_day_gap_is_unengaged() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", day(11)),
        ]);
        let unengaged = EngagementDetector::default().unengaged(&index);
        assert!(unengaged.contains("a"));
    }

    #[test]
    fn test_five_day_gap_is_engaged() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", day(6)),
        ]);
        assert!(EngagementDetector::default().unengaged(&index).is_empty());
    }

    #[test]
    fn test_exactly_seven_days_is_not_a_gap() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", day(8)),
        ]);
        assert!(EngagementDetector::default().unengaged(&index).is_empty());
    }

    #[test]
    fn test_only_adjacent_pairs_count() {
        // 12 days end to end, but no single gap above 7
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", day(7)),
            Event::new("a", "completed", "passed mq", day(13)),
        ]);
        assert!(EngagementDetector::default().unengaged(&index).is_empty());
    }

    #[test]
    fn test_untimed_events_are_ignored() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", None),
            Event::new("b", "", "inbox", None),
        ]);
        assert!(EngagementDetector::default().unengaged(&index).is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", day(4)),
        ]);
        let strict = EngagementDetector::new(2);
        assert_eq!(strict.gap_days(), 2);
        assert!(strict.unengaged(&index).contains("a"));
    }

    #[test]
    fn test_out_of_range_threshold_flags_nobody() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", day(1)),
            Event::new("a", "inbox", "completed", day(30)),
        ]);
        let detector = EngagementDetector::new(i64::MAX);
        assert!(detector.unengaged(&index).is_empty());
    }
}
