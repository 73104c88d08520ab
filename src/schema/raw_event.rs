//! funnel.raw_event.v1 schema definition
//!
//! One raw record per folder movement, as exported by the recruiting platform.
//! Every field is optional on the wire; the normalizer decides what survives.
//! Both snake_case names and the upstream export column names are accepted.

use crate::normalizer::parse_timestamp;
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "funnel.raw_event.v1";

/// Candidate identifier as it appears on the wire (string or numeric export)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateRef {
    Integer(i64),
    Unsigned(u64),
    Number(f64),
    Text(String),
}

impl CandidateRef {
    /// Canonical string key for grouping; `None` when the identifier is blank.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CandidateRef::Integer(i) => Some(i.to_string()),
            CandidateRef::Unsigned(u) => Some(u.to_string()),
            // Display never uses exponent notation and drops a zero fraction
            CandidateRef::Number(n) if n.is_finite() => Some(n.to_string()),
            CandidateRef::Number(_) => None,
            CandidateRef::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

impl From<&str> for CandidateRef {
    fn from(v: &str) -> Self {
        CandidateRef::Text(v.to_string())
    }
}

impl From<i64> for CandidateRef {
    fn from(v: i64) -> Self {
        CandidateRef::Integer(v)
    }
}

/// The funnel.raw_event.v1 record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Candidate (campaign invitation) identifier
    #[serde(default, alias = "CAMPAIGNINVITATIONID")]
    pub candidate_id: Option<CandidateRef>,
    /// Folder the candidate left
    #[serde(default, alias = "FOLDER_FROM_TITLE")]
    pub from_folder: Option<String>,
    /// Folder the candidate entered
    #[serde(default, alias = "FOLDER_TO_TITLE")]
    pub to_folder: Option<String>,
    /// Activity timestamp
    #[serde(default, alias = "ACTIVITY_CREATED_AT")]
    pub activity_time: Option<String>,
    /// Invitation timestamp (funnel entry)
    #[serde(default, alias = "INVITATIONDT")]
    pub invitation_time: Option<String>,
    /// Upstream insertion timestamp
    #[serde(default, alias = "INSERTEDDATE")]
    pub inserted_time: Option<String>,
    /// Work location
    #[serde(default, alias = "CAMPAIGN_SITE", skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Campaign title
    #[serde(default, alias = "CAMPAIGNTITLE", skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
}

impl RawEvent {
    /// Create a folder-movement record
    pub fn movement(
        candidate_id: impl Into<CandidateRef>,
        from_folder: Option<&str>,
        to_folder: Option<&str>,
        activity_time: &str,
    ) -> Self {
        RawEvent {
            candidate_id: Some(candidate_id.into()),
            from_folder: from_folder.map(str::to_string),
            to_folder: to_folder.map(str::to_string),
            activity_time: Some(activity_time.to_string()),
            ..Default::default()
        }
    }

    /// Add the invitation timestamp
    pub fn with_invitation_time(mut self, invitation_time: &str) -> Self {
        self.invitation_time = Some(invitation_time.to_string());
        self
    }

    /// Add the work location
    pub fn with_site(mut self, site: &str) -> Self {
        self.site = Some(site.to_string());
        self
    }

    /// Add the campaign title
    pub fn with_campaign(mut self, campaign: &str) -> Self {
        self.campaign = Some(campaign.to_string());
        self
    }

    /// Validate the record.
    ///
    /// Unparsable timestamps are reported here but are not fatal to a report run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self
            .candidate_id
            .as_ref()
            .and_then(CandidateRef::as_key)
            .is_none()
        {
            return Err(ValidationError::MissingCandidateId);
        }

        let timestamps = [
            ("activity_time", &self.activity_time),
            ("invitation_time", &self.invitation_time),
            ("inserted_time", &self.inserted_time),
        ];
        for (field, value) in timestamps {
            if let Some(raw) = value {
                if !raw.trim().is_empty() && parse_timestamp(raw).is_none() {
                    return Err(ValidationError::InvalidTimestamp {
                        field: field.to_string(),
                        value: raw.clone(),
                    });
                }
            }
        }

        if self.activity_time.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(ValidationError::MissingActivityTime);
        }

        Ok(())
    }
}

/// Validation errors for raw records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing candidate identifier")]
    MissingCandidateId,

    #[error("Missing activity timestamp; the record is excluded from timing metrics")]
    MissingActivityTime,

    #[error("Unparsable {field} value '{value}'; the field is treated as absent")]
    InvalidTimestamp { field: String, value: String },
}
