//! Event normalization
//!
//! This module turns raw records into normalized events:
//! - Timestamps parsed into UTC, unparsable values become absent
//! - Folder names trimmed and lowercased, missing names become ""
//! - Records without a candidate identifier dropped
//!
//! Every downstream stage assumes its input went through here.

use crate::schema::{CandidateRef, RawEvent};
use crate::types::Event;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Naive date-time layouts accepted in exports (interpreted as UTC)
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts (midnight UTC)
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Counters describing what normalization did to a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    /// Raw records seen
    pub total_records: usize,
    /// Events produced
    pub events_kept: usize,
    /// Records dropped because no candidate could be attributed
    pub dropped_without_candidate: usize,
    /// Kept events without a usable activity timestamp
    pub missing_activity_time: usize,
    /// Timestamp values (any field) that were present but unparsable
    pub unparsable_timestamps: usize,
}

/// Normalized events plus the summary of how they were produced
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvents {
    pub events: Vec<Event>,
    pub summary: NormalizationSummary,
}

/// Normalizer for converting raw records to events
pub struct EventNormalizer;

impl EventNormalizer {
    /// Normalize a batch of raw records
    pub fn normalize(records: &[RawEvent]) -> NormalizedEvents {
        let mut summary = NormalizationSummary {
            total_records: records.len(),
            ..Default::default()
        };
        let mut events = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let Some(candidate_id) = record.candidate_id.as_ref().and_then(CandidateRef::as_key)
            else {
                log::warn!("Dropping record {} without a candidate identifier", index);
                summary.dropped_without_candidate += 1;
                continue;
            };

            let activity_time = parse_field(record.activity_time.as_deref(), &mut summary);
            let invitation_time = parse_field(record.invitation_time.as_deref(), &mut summary);
            let inserted_time = parse_field(record.inserted_time.as_deref(), &mut summary);

            if activity_time.is_none() {
                summary.missing_activity_time += 1;
            }

            events.push(Event {
                candidate_id,
                from_folder: fold_folder(record.from_folder.as_deref()),
                to_folder: fold_folder(record.to_folder.as_deref()),
                activity_time,
                invitation_time,
                inserted_time,
                site: record.site.clone(),
                campaign: record.campaign.clone(),
            });
        }

        summary.events_kept = events.len();
        log::debug!(
            "Normalized {} of {} records ({} unparsable timestamps)",
            summary.events_kept,
            summary.total_records,
            summary.unparsable_timestamps
        );

        NormalizedEvents { events, summary }
    }
}

/// Fold a folder name to its comparison form: trimmed, lowercase, "" when missing
pub fn fold_folder(name: Option<&str>) -> String {
    name.map(|n| n.trim().to_lowercase()).unwrap_or_default()
}

/// Parse a timestamp in any of the accepted layouts; `None` when blank or unparsable
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_field(raw: Option<&str>, summary: &mut NormalizationSummary) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        summary.unparsable_timestamps += 1;
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:30"), Some(expected));
        assert_eq!(parse_timestamp("03/05/2024 10:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("soon"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_fold_folder() {
        assert_eq!(fold_folder(Some("  Talent Pool ")), "talent pool");
        assert_eq!(fold_folder(Some("")), "");
        assert_eq!(fold_folder(None), "");
    }

    #[test]
    fn test_normalize_batch() {
        let records = vec![
            RawEvent::movement("a", None, Some(" Inbox "), "2024-03-01 09:00:00")
                .with_invitation_time("2024-03-01")
                .with_site("Manila"),
            RawEvent::movement("a", Some("INBOX"), Some("Completed"), "garbage"),
            RawEvent {
                to_folder: Some("Inbox".to_string()),
                ..Default::default()
            },
        ];

        let normalized = EventNormalizer::normalize(&records);
        let events = &normalized.events;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].from_folder, "");
        assert_eq!(events[0].to_folder, "inbox");
        assert_eq!(events[0].site.as_deref(), Some("Manila"));
        assert!(events[0].invitation_time.is_some());
        assert_eq!(events[1].from_folder, "inbox");
        assert_eq!(events[1].activity_time, None);

        assert_eq!(
            normalized.summary,
            NormalizationSummary {
                total_records: 3,
                events_kept: 2,
                dropped_without_candidate: 1,
                missing_activity_time: 1,
                unparsable_timestamps: 1,
            }
        );
    }
}
