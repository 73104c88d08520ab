//! Population filtering
//!
//! Selects the events that make up the analysed population: an inclusive date
//! range on invitation time plus optional site and campaign allow-lists.

use crate::error::FunnelError;
use crate::types::Event;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Filter applied to normalized events before any metric is computed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationFilter {
    /// First invitation date included
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Last invitation date included
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Allowed sites; empty allows every site
    #[serde(default)]
    pub sites: Vec<String>,
    /// Allowed campaigns; empty allows every campaign
    #[serde(default)]
    pub campaigns: Vec<String>,
}

impl PopulationFilter {
    /// A filter that keeps every event
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep events whose invitation date falls in `[start, end]`
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn with_sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = sites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_campaigns<I, S>(mut self, campaigns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.campaigns = campaigns.into_iter().map(Into::into).collect();
        self
    }

    /// Window ending at the latest invitation date and reaching back `lookback_days`.
    ///
    /// Returns `None` when no event carries a valid invitation time, or when
    /// the lookback reaches outside the calendar range.
    pub fn default_window(events: &[Event], lookback_days: i64) -> Option<Self> {
        let latest = events
            .iter()
            .filter_map(|e| e.invitation_time)
            .max()?
            .date_naive();
        let start = Duration::try_days(lookback_days)
            .and_then(|lookback| latest.checked_sub_signed(lookback))?;
        Some(Self::between(start, latest))
    }

    pub fn validate(&self) -> Result<(), FunnelError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(FunnelError::InvalidFilter(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// Whether a single event belongs to the population
    pub fn matches(&self, event: &Event) -> bool {
        if self.start.is_some() || self.end.is_some() {
            let Some(invited) = event.invitation_time.map(|t| t.date_naive()) else {
                return false;
            };
            if self.start.is_some_and(|start| invited < start) {
                return false;
            }
            if self.end.is_some_and(|end| invited > end) {
                return false;
            }
        }

        if !self.sites.is_empty() && !allowed(&self.sites, event.site.as_deref()) {
            return false;
        }
        if !self.campaigns.is_empty() && !allowed(&self.campaigns, event.campaign.as_deref()) {
            return false;
        }

        true
    }

    /// Apply the filter, returning the surviving events in input order
    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

fn allowed(list: &[String], value: Option<&str>) -> bool {
    value.is_some_and(|v| list.iter().any(|item| item == v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn invited(id: &str, y: i32, m: u32, d: u32, hour: u32) -> Event {
        Event::new(id, "", "inbox", None)
            .with_invitation_time(Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_inclusive_of_end_date() {
        let events = vec![
            invited("before", 2024, 2, 29, 23),
            invited("first", 2024, 3, 1, 0),
            invited("last", 2024, 3, 31, 23),
            invited("after", 2024, 4, 1, 0),
        ];

        let filter = PopulationFilter::between(date(2024, 3, 1), date(2024, 3, 31));
        let kept: Vec<String> = filter
            .apply(&events)
            .into_iter()
            .map(|e| e.candidate_id)
            .collect();

        assert_eq!(kept, vec!["first".to_string(), "last".to_string()]);
    }

    #[test]
    fn test_range_excludes_missing_invitation() {
        let event = Event::new("x", "", "inbox", None);
        let filter = PopulationFilter::between(date(2024, 3, 1), date(2024, 3, 31));
        assert!(!filter.matches(&event));
        assert!(PopulationFilter::all().matches(&event));
    }

    #[test]
    fn test_site_and_campaign_allow_lists() {
        let manila = invited("a", 2024, 3, 1, 0)
            .with_site("Manila")
            .with_campaign("Support");
        let cebu = invited("b", 2024, 3, 1, 0)
            .with_site("Cebu")
            .with_campaign("Sales");

        let by_site = PopulationFilter::all().with_sites(["Manila"]);
        assert!(by_site.matches(&manila));
        assert!(!by_site.matches(&cebu));

        let by_campaign = PopulationFilter::all().with_campaigns(["Sales", "Billing"]);
        assert!(!by_campaign.matches(&manila));
        assert!(by_campaign.matches(&cebu));
    }

    #[test]
    fn test_default_window() {
        let events = vec![
            invited("a", 2024, 1, 10, 8),
            invited("b", 2024, 4, 30, 17),
            Event::new("c", "", "inbox", None),
        ];

        let window = PopulationFilter::default_window(&events, 60).unwrap();
        assert_eq!(window.end, Some(date(2024, 4, 30)));
        assert_eq!(window.start, Some(date(2024, 3, 1)));

        assert!(PopulationFilter::default_window(&events[2..], 60).is_none());
    }

    #[test]
    fn test_default_window_outside_calendar_is_none() {
        let events = vec![invited("a", 2024, 4, 30, 17)];
        assert!(PopulationFilter::default_window(&events, 2_000_000_000).is_none());
        assert!(PopulationFilter::default_window(&events, i64::MAX).is_none());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let filter = PopulationFilter::between(date(2024, 5, 1), date(2024, 4, 1));
        assert!(filter.validate().is_err());
        assert!(PopulationFilter::all().validate().is_ok());
    }
}
