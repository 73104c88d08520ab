//! Per-candidate grouping of the event log
//!
//! The index is built once per filtered population and shared read-only by the
//! classifier, the engagement detector and the duration aggregator.

use crate::types::Event;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// All events of one candidate, ordered by activity time
///
/// Timed events come first in ascending order (ties keep input order);
/// events without an activity time follow in input order.
#[derive(Debug, Clone)]
pub struct CandidateTimeline {
    candidate_id: String,
    events: Vec<Event>,
    timed_len: usize,
}

impl CandidateTimeline {
    fn new(candidate_id: String, mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| (e.activity_time.is_none(), e.activity_time));
        let timed_len = events.iter().filter(|e| e.activity_time.is_some()).count();
        Self {
            candidate_id,
            events,
            timed_len,
        }
    }

    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    /// Every event of the candidate
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events with a valid activity time, ascending
    pub fn timed_events(&self) -> &[Event] {
        &self.events[..self.timed_len]
    }

    /// Earliest activity (the funnel-entry anchor)
    pub fn first_activity(&self) -> Option<DateTime<Utc>> {
        self.timed_events().first().and_then(|e| e.activity_time)
    }

    /// Latest activity
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.timed_events().last().and_then(|e| e.activity_time)
    }
}

/// Map from candidate id to that candidate's timeline
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    timelines: HashMap<String, CandidateTimeline>,
    /// Candidate ids in first-seen order
    order: Vec<String>,
    event_count: usize,
}

impl CandidateIndex {
    /// Group normalized events by candidate
    pub fn build(events: Vec<Event>) -> Self {
        let event_count = events.len();
        let mut order = Vec::new();
        let mut grouped: HashMap<String, Vec<Event>> = HashMap::new();

        for event in events {
            match grouped.get_mut(&event.candidate_id) {
                Some(list) => list.push(event),
                None => {
                    order.push(event.candidate_id.clone());
                    grouped.insert(event.candidate_id.clone(), vec![event]);
                }
            }
        }

        let timelines = grouped
            .into_iter()
            .map(|(id, events)| (id.clone(), CandidateTimeline::new(id, events)))
            .collect();

        Self {
            timelines,
            order,
            event_count,
        }
    }

    pub fn get(&self, candidate_id: &str) -> Option<&CandidateTimeline> {
        self.timelines.get(candidate_id)
    }

    /// Timelines in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &CandidateTimeline> {
        self.order.iter().filter_map(|id| self.timelines.get(id))
    }

    /// Number of distinct candidates
    pub fn population(&self) -> usize {
        self.order.len()
    }

    /// Number of events across all candidates
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(day: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_build_groups_by_candidate() {
        let index = CandidateIndex::build(vec![
            Event::new("b", "", "inbox", at(2)),
            Event::new("a", "", "inbox", at(1)),
            Event::new("b", "inbox", "completed", at(4)),
        ]);

        assert_eq!(index.population(), 2);
        assert_eq!(index.event_count(), 3);
        let ids: Vec<&str> = index.iter().map(|t| t.candidate_id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(index.get("b").unwrap().events().len(), 2);
    }

    #[test]
    fn test_timeline_ordering_puts_untimed_last() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "inbox", "completed", at(5)),
            Event::new("a", "completed", "hired", None),
            Event::new("a", "", "inbox", at(1)),
        ]);

        let timeline = index.get("a").unwrap();
        let folders: Vec<&str> = timeline
            .events()
            .iter()
            .map(|e| e.to_folder.as_str())
            .collect();
        assert_eq!(folders, vec!["inbox", "completed", "hired"]);
        assert_eq!(timeline.timed_events().len(), 2);
        assert_eq!(timeline.first_activity(), at(1));
        assert_eq!(timeline.last_activity(), at(5));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let index = CandidateIndex::build(vec![
            Event::new("a", "", "inbox", at(1)),
            Event::new("a", "inbox", "completed", at(1)),
        ]);

        let timeline = index.get("a").unwrap();
        assert_eq!(timeline.events()[0].to_folder, "inbox");
        assert_eq!(timeline.events()[1].to_folder, "completed");
    }

    #[test]
    fn test_candidate_without_timestamps_has_no_bounds() {
        let index = CandidateIndex::build(vec![Event::new("a", "", "inbox", None)]);
        let timeline = index.get("a").unwrap();
        assert_eq!(timeline.first_activity(), None);
        assert_eq!(timeline.last_activity(), None);
        assert!(timeline.timed_events().is_empty());
    }
}
