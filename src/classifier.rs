//! Transition classification
//!
//! A candidate made a transition when at least one recorded move satisfies both
//! the from-side and the to-side of the definition on the same event.

use crate::timeline::CandidateIndex;
use crate::types::{Event, FolderSpec};
use std::collections::HashSet;

/// Whether one event is a qualifying `from → to` move
pub fn is_transition_event(event: &Event, from: &FolderSpec, to: &FolderSpec) -> bool {
    from.matches_from(&event.from_folder) && to.matches_to(&event.to_folder)
}

/// Candidates with at least one qualifying move.
///
/// Timestamps are not read; an event with no activity time still classifies.
pub fn classify(index: &CandidateIndex, from: &FolderSpec, to: &FolderSpec) -> HashSet<String> {
    index
        .iter()
        .filter(|timeline| {
            timeline
                .events()
                .iter()
                .any(|event| is_transition_event(event, from, to))
        })
        .map(|timeline| timeline.candidate_id().to_string())
        .collect()
}
