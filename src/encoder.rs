//! Report encoding
//!
//! Wraps a computed summary with report metadata and serializes it. Rows keep
//! the summary-table column names and order.

use crate::error::FunnelError;
use crate::report::FunnelSummary;
use crate::types::FunnelReport;
use crate::{FUNNEL_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Encoder for producing report payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode a summary into a report
    pub fn encode(&self, summary: FunnelSummary) -> FunnelReport {
        FunnelReport {
            report_id: Uuid::new_v4().to_string(),
            producer: PRODUCER_NAME.to_string(),
            version: FUNNEL_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            computed_at_utc: Utc::now().to_rfc3339(),
            population: summary.population,
            events_considered: summary.events_considered,
            unengaged_population: summary.unengaged_population,
            engagement_gap_days: summary.engagement_gap_days,
            rows: summary.rows,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, summary: FunnelSummary) -> Result<String, FunnelError> {
        let report = self.encode(summary);
        serde_json::to_string(&report).map_err(|e| FunnelError::EncodingError(e.to_string()))
    }
}

/// Rows only, one JSON object per line
pub fn rows_to_ndjson(report: &FunnelReport) -> Result<String, FunnelError> {
    let mut lines = Vec::with_capacity(report.rows.len());
    for row in &report.rows {
        lines.push(
            serde_json::to_string(row).map_err(|e| FunnelError::EncodingError(e.to_string()))?,
        );
    }
    Ok(lines.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransitionResult;

    fn sample_summary() -> FunnelSummary {
        FunnelSummary {
            population: 3,
            events_considered: 7,
            unengaged_population: 1,
            engagement_gap_days: 7,
            rows: vec![
                TransitionResult {
                    title: "Application to Completed".to_string(),
                    count: 2,
                    percentage: "66.67".to_string(),
                    avg_duration_days: "4.5".to_string(),
                    avg_duration_days_engaged: "3.0".to_string(),
                    unengaged_count: 1,
                },
                TransitionResult::empty("Application to Hired"),
            ],
        }
    }

    #[test]
    fn test_encode_carries_metadata() {
        let encoder = ReportEncoder::with_instance_id("instance-1".to_string());
        let report = encoder.encode(sample_summary());

        assert_eq!(report.instance_id, "instance-1");
        assert_eq!(report.producer, PRODUCER_NAME);
        assert_eq!(report.population, 3);
        assert_eq!(report.rows.len(), 2);
        assert!(Uuid::parse_str(&report.report_id).is_ok());
    }

    #[test]
    fn test_encode_to_json_uses_table_columns() {
        let json = ReportEncoder::new().encode_to_json(sample_summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let first = &value["rows"][0];
        assert_eq!(first["Metric"], "Application to Completed");
        assert_eq!(first["Count"], 2);
        assert_eq!(first["Percentage(%)"], "66.67");
        assert_eq!(first["Avg Time (In Days)"], "4.5");
        assert_eq!(first["Avg Time(Threshold)"], "3.0");
        assert_eq!(first["Unengaged Candidates Count"], 1);
        assert_eq!(value["rows"][1]["Avg Time (In Days)"], "N/A");
    }

    #[test]
    fn test_rows_to_ndjson_preserves_column_order() {
        let report = ReportEncoder::new().encode(sample_summary());
        let ndjson = rows_to_ndjson(&report).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"{"Metric":"Application to Completed","Count":2,"Percentage(%)""#));
        assert!(lines[1].ends_with(r#""Unengaged Candidates Count":0}"#));
    }
}
