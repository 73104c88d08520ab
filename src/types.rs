//! Core types for the Funnel Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: normalized events, transition definitions, and report rows.

use crate::normalizer::fold_folder;
use crate::taxonomy::is_client_folder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel shown when no candidate contributes a duration sample
pub const NOT_AVAILABLE: &str = "N/A";

/// One normalized folder-movement activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Candidate identifier (stable across events)
    pub candidate_id: String,
    /// Folder the candidate moved out of; empty when there was no prior folder
    pub from_folder: String,
    /// Folder the candidate moved into
    pub to_folder: String,
    /// When the move was recorded
    pub activity_time: Option<DateTime<Utc>>,
    /// When the candidate was invited into the funnel
    pub invitation_time: Option<DateTime<Utc>>,
    /// When the record was inserted upstream
    pub inserted_time: Option<DateTime<Utc>>,
    /// Work location
    pub site: Option<String>,
    /// Campaign title
    pub campaign: Option<String>,
}

impl Event {
    /// Create a movement event; folder names are folded to their normalized form.
    pub fn new(
        candidate_id: impl Into<String>,
        from_folder: &str,
        to_folder: &str,
        activity_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            from_folder: fold_folder(Some(from_folder)),
            to_folder: fold_folder(Some(to_folder)),
            activity_time,
            invitation_time: None,
            inserted_time: None,
            site: None,
            campaign: None,
        }
    }

    pub fn with_invitation_time(mut self, invitation_time: DateTime<Utc>) -> Self {
        self.invitation_time = Some(invitation_time);
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }
}

/// One side of a transition definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FolderSpec {
    /// The candidate came from any folder (from-side only)
    Any,
    /// No prior folder was recorded (from-side only)
    Empty,
    /// Any folder outside the system taxonomy
    ClientFolder,
    /// A specific folder, stored normalized
    Literal(String),
}

impl FolderSpec {
    /// Parse a folder spec from its display form.
    ///
    /// `"Any"` and `"Client Folder"` are keywords (case-insensitive), an empty
    /// string is [`FolderSpec::Empty`], anything else is a literal folder name.
    pub fn parse(raw: &str) -> Self {
        let folded = fold_folder(Some(raw));
        match folded.as_str() {
            "" => FolderSpec::Empty,
            "any" => FolderSpec::Any,
            "client folder" => FolderSpec::ClientFolder,
            _ => FolderSpec::Literal(folded),
        }
    }

    /// Whether a normalized `from_folder` value satisfies this folder spec.
    pub fn matches_from(&self, from_folder: &str) -> bool {
        match self {
            FolderSpec::Any => !from_folder.is_empty(),
            FolderSpec::Empty => from_folder.is_empty(),
            FolderSpec::ClientFolder => is_client_folder(from_folder),
            FolderSpec::Literal(name) => from_folder == name,
        }
    }

    /// Whether a normalized `to_folder` value satisfies this folder spec.
    ///
    /// `Any` and `Empty` are from-side specs and never match a destination.
    pub fn matches_to(&self, to_folder: &str) -> bool {
        match self {
            FolderSpec::ClientFolder => is_client_folder(to_folder),
            FolderSpec::Literal(name) => to_folder == name,
            FolderSpec::Any | FolderSpec::Empty => false,
        }
    }

    pub fn is_from_only(&self) -> bool {
        matches!(self, FolderSpec::Any | FolderSpec::Empty)
    }
}

impl From<String> for FolderSpec {
    fn from(raw: String) -> Self {
        FolderSpec::parse(&raw)
    }
}

impl From<FolderSpec> for String {
    fn from(spec: FolderSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for FolderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderSpec::Any => write!(f, "Any"),
            FolderSpec::Empty => write!(f, ""),
            FolderSpec::ClientFolder => write!(f, "Client Folder"),
            FolderSpec::Literal(name) => write!(f, "{}", name),
        }
    }
}

/// A named from→to folder movement to measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub title: String,
    pub from: FolderSpec,
    pub to: FolderSpec,
}

impl TransitionDefinition {
    pub fn new(title: impl Into<String>, from: &str, to: &str) -> Self {
        Self {
            title: title.into(),
            from: FolderSpec::parse(from),
            to: FolderSpec::parse(to),
        }
    }
}

/// One row of the funnel summary table
///
/// Field order and serialized names are the column contract of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    #[serde(rename = "Metric")]
    pub title: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Percentage(%)")]
    pub percentage: String,
    #[serde(rename = "Avg Time (In Days)")]
    pub avg_duration_days: String,
    #[serde(rename = "Avg Time(Threshold)")]
    pub avg_duration_days_engaged: String,
    #[serde(rename = "Unengaged Candidates Count")]
    pub unengaged_count: usize,
}

impl TransitionResult {
    /// A row for a transition nobody made (or that could not be computed)
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            count: 0,
            percentage: format_percentage(0, 0),
            avg_duration_days: format_average(None),
            avg_duration_days_engaged: format_average(None),
            unengaged_count: 0,
        }
    }
}

/// Column headers of the summary table, in order
pub const REPORT_COLUMNS: [&str; 6] = [
    "Metric",
    "Count",
    "Percentage(%)",
    "Avg Time (In Days)",
    "Avg Time(Threshold)",
    "Unengaged Candidates Count",
];

/// Format `count / total` as a two-decimal percentage; "0.00" for an empty population.
pub fn format_percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", count as f64 / total as f64 * 100.0)
}

/// Format an average in days to one decimal, or the "N/A" sentinel.
pub fn format_average(average: Option<f64>) -> String {
    match average {
        Some(days) => format!("{:.1}", days),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Complete funnel report for one filtered population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    /// Unique identifier of this computation
    pub report_id: String,
    /// Producer name
    pub producer: String,
    /// Producer version
    pub version: String,
    /// Encoder instance that produced the report
    pub instance_id: String,
    /// When the report was computed
    pub computed_at_utc: String,
    /// Distinct candidates in the filtered population
    pub population: usize,
    /// Events that passed the population filter
    pub events_considered: usize,
    /// Candidates flagged as unengaged across the whole population
    pub unengaged_population: usize,
    /// Gap threshold used for the engagement split
    pub engagement_gap_days: i64,
    /// One row per transition, in catalogue order
    pub rows: Vec<TransitionResult>,
}
