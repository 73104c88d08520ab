//! Metric report building
//!
//! Runs the transition catalogue over one filtered population. The candidate
//! index and the unengaged set are built once and shared read-only; rows are
//! computed in parallel and collected in catalogue order.

use crate::classifier::classify;
use crate::config::{validate_definition, FunnelConfig};
use crate::duration::DurationAggregator;
use crate::engagement::EngagementDetector;
use crate::error::FunnelError;
use crate::timeline::CandidateIndex;
use crate::types::{
    format_average, format_percentage, Event, TransitionDefinition, TransitionResult,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The standard funnel stages, in report order
pub fn default_catalogue() -> Vec<TransitionDefinition> {
    [
        ("Application to Completed", "Any", "Completed"),
        ("Application to Passed Prescreening", "Any", "Passed MQ"),
        ("Passed Prescreening to Talent Pool", "Passed MQ", "Talent Pool"),
        ("Application to Talent Pool", "Any", "Talent Pool"),
        ("Application to Client Folder", "Any", "Client Folder"),
        ("Application to Shortlisted", "Any", "Shortlisted"),
        ("Application to Hired", "Any", "Hired"),
        ("Talent Pool to Client Folder", "Talent Pool", "Client Folder"),
        ("Talent Pool to Shortlisted", "Talent Pool", "Shortlisted"),
        ("Client Folder to Shortlisted", "Client Folder", "Shortlisted"),
        ("Shortlisted to Hired", "Shortlisted", "Hired"),
        ("Shortlisted to Rejected", "Shortlisted", "Rejected"),
    ]
    .into_iter()
    .map(|(title, from, to)| TransitionDefinition::new(title, from, to))
    .collect()
}

/// Report rows plus population statistics, before encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelSummary {
    pub population: usize,
    pub events_considered: usize,
    pub unengaged_population: usize,
    pub engagement_gap_days: i64,
    pub rows: Vec<TransitionResult>,
}

/// Builder that runs a catalogue over filtered events
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    catalogue: Vec<TransitionDefinition>,
    detector: EngagementDetector,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(default_catalogue(), EngagementDetector::default())
    }
}

impl ReportBuilder {
    pub fn new(catalogue: Vec<TransitionDefinition>, detector: EngagementDetector) -> Self {
        Self {
            catalogue,
            detector,
        }
    }

    pub fn from_config(config: &FunnelConfig) -> Self {
        Self::new(
            config.catalogue(),
            EngagementDetector::new(config.engagement_gap_days),
        )
    }

    pub fn catalogue(&self) -> &[TransitionDefinition] {
        &self.catalogue
    }

    /// Compute every row for an already-filtered population
    pub fn build(&self, events: Vec<Event>) -> FunnelSummary {
        let index = CandidateIndex::build(events);
        let population = index.population();

        if index.is_empty() {
            log::info!("Filtered population is empty; reporting zero rows");
            return FunnelSummary {
                population: 0,
                events_considered: 0,
                unengaged_population: 0,
                engagement_gap_days: self.detector.gap_days(),
                rows: self
                    .catalogue
                    .iter()
                    .map(|def| TransitionResult::empty(def.title.clone()))
                    .collect(),
            };
        }

        let unengaged = self.detector.unengaged(&index);
        log::debug!(
            "Population of {} candidates ({} events), {} unengaged",
            population,
            index.event_count(),
            unengaged.len()
        );

        let rows = self
            .catalogue
            .par_iter()
            .map(|def| {
                compute_row(def, &index, &unengaged).unwrap_or_else(|e| {
                    log::warn!("Transition '{}' degraded to an empty row: {}", def.title, e);
                    TransitionResult::empty(def.title.clone())
                })
            })
            .collect();

        FunnelSummary {
            population,
            events_considered: index.event_count(),
            unengaged_population: unengaged.len(),
            engagement_gap_days: self.detector.gap_days(),
            rows,
        }
    }
}

/// Compute a single row over the shared index
pub fn compute_row(
    def: &TransitionDefinition,
    index: &CandidateIndex,
    unengaged: &HashSet<String>,
) -> Result<TransitionResult, FunnelError> {
    validate_definition(def)?;

    let classified = classify(index, &def.from, &def.to);
    let durations =
        DurationAggregator::new(index, unengaged).aggregate(&classified, &def.from, &def.to)?;

    Ok(TransitionResult {
        title: def.title.clone(),
        count: classified.len(),
        percentage: format_percentage(classified.len(), index.population()),
        avg_duration_days: format_average(durations.overall_avg),
        avg_duration_days_engaged: format_average(durations.engaged_avg),
        unengaged_count: durations.unengaged_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FolderSpec;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn t(days: i64) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::days(days))
    }

    fn row<'a>(summary: &'a FunnelSummary, title: &str) -> &'a TransitionResult {
        summary.rows.iter().find(|r| r.title == title).unwrap()
    }

    fn sample_events() -> Vec<Event> {
        vec![
            // completes in 5 days, engaged
            Event::new("a", "", "Inbox", t(0)),
            Event::new("a", "Inbox", "Completed", t(5)),
            // reaches the talent pool via prescreening, then a client folder after a long gap
            Event::new("b", "", "Inbox", t(0)),
            Event::new("b", "Inbox", "Passed MQ", t(2)),
            Event::new("b", "Passed MQ", "Talent Pool", t(4)),
            Event::new("b", "Talent Pool", "Interview Scheduled", t(14)),
            Event::new("b", "Interview Scheduled", "Shortlisted", t(15)),
            Event::new("b", "Shortlisted", "Hired", t(17)),
            // only entered the funnel
            Event::new("c", "", "Inbox", t(1)),
            // moved with a broken timestamp
            Event::new("d", "", "Inbox", None),
            Event::new("d", "Inbox", "Completed", None),
        ]
    }

    #[test]
    fn test_rows_follow_catalogue_order() {
        let summary = ReportBuilder::default().build(sample_events());
        let titles: Vec<String> = summary.rows.iter().map(|r| r.title.clone()).collect();
        let expected: Vec<String> = default_catalogue().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn test_application_to_completed() {
        let summary = ReportBuilder::default().build(sample_events());
        assert_eq!(summary.population, 4);
        assert_eq!(
            row(&summary, "Application to Completed"),
            &TransitionResult {
                title: "Application to Completed".to_string(),
                count: 2,
                percentage: "50.00".to_string(),
                avg_duration_days: "5.0".to_string(),
                avg_duration_days_engaged: "5.0".to_string(),
                unengaged_count: 0,
            }
        );
    }

    #[test]
    fn test_unengaged_candidate_rows() {
        let summary = ReportBuilder::default().build(sample_events());
        assert_eq!(summary.unengaged_population, 1);

        let hired = row(&summary, "Application to Hired");
        assert_eq!(hired.count, 1);
        assert_eq!(hired.percentage, "25.00");
        assert_eq!(hired.avg_duration_days, "17.0");
        assert_eq!(hired.avg_duration_days_engaged, "N/A");
        assert_eq!(hired.unengaged_count, 1);

        let tp_client = row(&summary, "Talent Pool to Client Folder");
        assert_eq!(tp_client.count, 1);
        // measured from the move out of Talent Pool, not from arrival in it
        assert_eq!(tp_client.avg_duration_days, "0.0");

        let client_short = row(&summary, "Client Folder to Shortlisted");
        assert_eq!(client_short.count, 1);
        assert_eq!(client_short.avg_duration_days, "0.0");
    }

    #[test]
    fn test_invariants_hold_for_every_row() {
        let summary = ReportBuilder::default().build(sample_events());
        for r in &summary.rows {
            assert!(r.count <= summary.population, "{}", r.title);
            assert!(r.unengaged_count <= r.count, "{}", r.title);
        }
    }

    #[test]
    fn test_empty_population() {
        let summary = ReportBuilder::default().build(Vec::new());
        assert_eq!(summary.population, 0);
        assert_eq!(summary.rows.len(), 12);
        for r in &summary.rows {
            assert_eq!(r, &TransitionResult::empty(r.title.clone()));
            assert_eq!(r.percentage, "0.00");
            assert_eq!(r.avg_duration_days, "N/A");
            assert_eq!(r.avg_duration_days_engaged, "N/A");
        }
    }

    #[test]
    fn test_invalid_definition_degrades_only_its_row() {
        let catalogue = vec![
            TransitionDefinition {
                title: "Broken".to_string(),
                from: FolderSpec::parse("Inbox"),
                to: FolderSpec::Any,
            },
            TransitionDefinition::new("Application to Completed", "Any", "Completed"),
        ];
        let summary =
            ReportBuilder::new(catalogue, EngagementDetector::default()).build(sample_events());

        assert_eq!(summary.rows[0], TransitionResult::empty("Broken"));
        assert_eq!(summary.rows[1].count, 2);
    }

    #[test]
    fn test_end_before_start_still_counts_without_duration() {
        // The qualifying move is untimed, so the latest arrival in Talent Pool
        // (day 1) precedes the first timed exit from Passed MQ (day 5).
        let events = vec![
            Event::new("x", "", "Inbox", t(0)),
            Event::new("x", "Inbox", "Talent Pool", t(1)),
            Event::new("x", "Passed MQ", "Rejected", t(5)),
            Event::new("x", "Passed MQ", "Talent Pool", None),
            Event::new("y", "", "Inbox", t(0)),
        ];
        let catalogue = vec![TransitionDefinition::new(
            "Passed Prescreening to Talent Pool",
            "Passed MQ",
            "Talent Pool",
        )];
        let summary =
            ReportBuilder::new(catalogue, EngagementDetector::default()).build(events);

        assert_eq!(
            summary.rows[0],
            TransitionResult {
                title: "Passed Prescreening to Talent Pool".to_string(),
                count: 1,
                percentage: "50.00".to_string(),
                avg_duration_days: "N/A".to_string(),
                avg_duration_days_engaged: "N/A".to_string(),
                unengaged_count: 0,
            }
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = ReportBuilder::default();
        let first = builder.build(sample_events());
        let second = builder.build(sample_events());
        assert_eq!(first, second);
    }

    #[test]
    fn test_wider_gap_threshold_changes_engagement_split() {
        let config = FunnelConfig {
            engagement_gap_days: 14,
            ..Default::default()
        };
        let summary = ReportBuilder::from_config(&config).build(sample_events());
        assert_eq!(summary.unengaged_population, 0);
        assert_eq!(row(&summary, "Application to Hired").avg_duration_days_engaged, "17.0");
    }
}
