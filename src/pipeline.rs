//! Pipeline orchestration
//!
//! This module provides the public API for Funnel Flux.
//! It orchestrates the full pipeline from raw event JSON to a funnel report.

use crate::config::FunnelConfig;
use crate::encoder::ReportEncoder;
use crate::error::FunnelError;
use crate::filter::PopulationFilter;
use crate::normalizer::{EventNormalizer, NormalizationSummary};
use crate::report::{FunnelSummary, ReportBuilder};
use crate::schema::{RawEvent, RawEventAdapter};
use crate::types::{Event, FunnelReport};

/// Convert a raw event JSON array into a funnel report JSON payload.
///
/// # Arguments
/// * `raw_json` - JSON array of funnel.raw_event.v1 records
/// * `filter_json` - Optional population filter JSON; `None` keeps every event
///
/// # Example
/// ```ignore
/// let report_json = events_to_funnel_report(
///     events_json,
///     Some(r#"{"start": "2024-03-01", "end": "2024-04-30"}"#.to_string()),
/// )?;
/// ```
pub fn events_to_funnel_report(
    raw_json: String,
    filter_json: Option<String>,
) -> Result<String, FunnelError> {
    let filter = match filter_json {
        Some(json) => serde_json::from_str::<PopulationFilter>(&json)?,
        None => PopulationFilter::all(),
    };

    let mut processor = FunnelProcessor::new();
    processor.load_json(&raw_json)?;
    processor.report_json(&filter)
}

/// Processor holding one normalized event log and its configuration.
///
/// Load the log once, then call [`FunnelProcessor::report`] for every filter
/// change; each call recomputes from scratch.
pub struct FunnelProcessor {
    config: FunnelConfig,
    builder: ReportBuilder,
    encoder: ReportEncoder,
    events: Vec<Event>,
    summary: NormalizationSummary,
}

impl Default for FunnelProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FunnelProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::build(FunnelConfig::default())
    }

    /// Create a processor from a validated configuration
    pub fn with_config(config: FunnelConfig) -> Result<Self, FunnelError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: FunnelConfig) -> Self {
        Self {
            builder: ReportBuilder::from_config(&config),
            encoder: ReportEncoder::new(),
            config,
            events: Vec::new(),
            summary: NormalizationSummary::default(),
        }
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    pub fn builder(&self) -> &ReportBuilder {
        &self.builder
    }

    /// Replace the event log with a batch of raw records
    pub fn load_records(&mut self, records: &[RawEvent]) {
        let normalized = EventNormalizer::normalize(records);
        self.events = normalized.events;
        self.summary = normalized.summary;
        log::info!(
            "Loaded {} events ({} records dropped)",
            self.summary.events_kept,
            self.summary.dropped_without_candidate
        );
    }

    /// Replace the event log with records from a JSON array
    pub fn load_json(&mut self, json: &str) -> Result<(), FunnelError> {
        let records = RawEventAdapter::parse_array(json)?;
        self.load_records(&records);
        Ok(())
    }

    /// Replace the event log with records from NDJSON
    pub fn load_ndjson(&mut self, ndjson: &str) -> Result<(), FunnelError> {
        let records = RawEventAdapter::parse_ndjson(ndjson)?;
        self.load_records(&records);
        Ok(())
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn normalization_summary(&self) -> &NormalizationSummary {
        &self.summary
    }

    /// Invitation-date window ending at the latest invitation, `lookback_days` long
    pub fn default_filter(&self) -> Option<PopulationFilter> {
        PopulationFilter::default_window(&self.events, self.config.lookback_days)
    }

    /// Compute report rows for the given filter
    pub fn summarize(&self, filter: &PopulationFilter) -> Result<FunnelSummary, FunnelError> {
        filter.validate()?;
        let population = filter.apply(&self.events);
        log::debug!(
            "Filter kept {} of {} events",
            population.len(),
            self.events.len()
        );
        Ok(self.builder.build(population))
    }

    /// Compute the full report for the given filter
    pub fn report(&self, filter: &PopulationFilter) -> Result<FunnelReport, FunnelError> {
        let summary = self.summarize(filter)?;
        Ok(self.encoder.encode(summary))
    }

    /// Compute the report and encode it as JSON
    pub fn report_json(&self, filter: &PopulationFilter) -> Result<String, FunnelError> {
        let summary = self.summarize(filter)?;
        self.encoder.encode_to_json(summary)
    }
}
