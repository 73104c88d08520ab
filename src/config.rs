//! Report configuration
//!
//! Loaded from TOML. Every field is optional; an empty file yields the built-in
//! behavior (7-day engagement gap, 60-day lookback, standard catalogue).

use crate::engagement::DEFAULT_ENGAGEMENT_GAP_DAYS;
use crate::error::FunnelError;
use crate::report::default_catalogue;
use crate::types::TransitionDefinition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default population window before the latest invitation (days)
pub const DEFAULT_LOOKBACK_DAYS: i64 = 60;

/// Upper bound for any day-count setting (100 years)
pub const MAX_CONFIG_DAYS: i64 = 36_500;

/// Configuration for a report run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelConfig {
    /// Gap between consecutive activities above which a candidate is unengaged
    #[serde(default = "default_gap_days")]
    pub engagement_gap_days: i64,
    /// Length of the default invitation-date window
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Replacement transition catalogue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Vec<TransitionDefinition>>,
}

fn default_gap_days() -> i64 {
    DEFAULT_ENGAGEMENT_GAP_DAYS
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            engagement_gap_days: DEFAULT_ENGAGEMENT_GAP_DAYS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            transitions: None,
        }
    }
}

impl FunnelConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, FunnelError> {
        let config: FunnelConfig = toml::from_str(contents)
            .map_err(|e| FunnelError::ConfigError(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, FunnelError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            FunnelError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FunnelError> {
        if !(1..=MAX_CONFIG_DAYS).contains(&self.engagement_gap_days) {
            return Err(FunnelError::ConfigError(format!(
                "engagement_gap_days must be between 1 and {}, got {}",
                MAX_CONFIG_DAYS, self.engagement_gap_days
            )));
        }
        if !(0..=MAX_CONFIG_DAYS).contains(&self.lookback_days) {
            return Err(FunnelError::ConfigError(format!(
                "lookback_days must be between 0 and {}, got {}",
                MAX_CONFIG_DAYS, self.lookback_days
            )));
        }
        if let Some(transitions) = &self.transitions {
            if transitions.is_empty() {
                return Err(FunnelError::ConfigError(
                    "transitions must list at least one definition".to_string(),
                ));
            }
            for def in transitions {
                validate_definition(def)?;
            }
        }
        Ok(())
    }

    /// The active transition catalogue
    pub fn catalogue(&self) -> Vec<TransitionDefinition> {
        self.transitions.clone().unwrap_or_else(default_catalogue)
    }
}

/// Reject definitions that can never match
pub fn validate_definition(def: &TransitionDefinition) -> Result<(), FunnelError> {
    if def.title.trim().is_empty() {
        return Err(FunnelError::InvalidTransition(
            "transition title must not be empty".to_string(),
        ));
    }
    if def.to.is_from_only() {
        return Err(FunnelError::InvalidTransition(format!(
            "'{}': destination '{}' is only valid on the from-side",
            def.title, def.to
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FolderSpec;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_is_default() {
        let config = FunnelConfig::from_toml_str("").unwrap();
        assert_eq!(config, FunnelConfig::default());
        assert_eq!(config.catalogue().len(), 12);
    }

    #[test]
    fn test_override_catalogue_and_threshold() {
        let toml = r#"
            engagement_gap_days = 14

            [[transitions]]
            title = "Inbox to Hired"
            from = "Inbox"
            to = "Hired"

            [[transitions]]
            title = "New to Client"
            from = ""
            to = "Client Folder"
        "#;

        let config = FunnelConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.engagement_gap_days, 14);
        assert_eq!(config.lookback_days, DEFAULT_LOOKBACK_DAYS);

        let catalogue = config.catalogue();
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue[1].from, FolderSpec::Empty);
        assert_eq!(catalogue[1].to, FolderSpec::ClientFolder);
    }

    #[test]
    fn test_rejects_non_positive_gap() {
        let err = FunnelConfig::from_toml_str("engagement_gap_days = 0").unwrap_err();
        assert!(matches!(err, FunnelError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_day_counts_beyond_range() {
        let err = FunnelConfig::from_toml_str("engagement_gap_days = 9223372036854775807").unwrap_err();
        assert!(matches!(err, FunnelError::ConfigError(_)));

        let err = FunnelConfig::from_toml_str("lookback_days = 2000000000").unwrap_err();
        assert!(matches!(err, FunnelError::ConfigError(_)));

        let edge = format!("engagement_gap_days = {0}\nlookback_days = {0}", MAX_CONFIG_DAYS);
        assert!(FunnelConfig::from_toml_str(&edge).is_ok());
    }

    #[test]
    fn test_rejects_from_only_destination() {
        let toml = r#"
            [[transitions]]
            title = "Broken"
            from = "Inbox"
            to = "Any"
        "#;
        let err = FunnelConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, FunnelError::InvalidTransition(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(FunnelConfig::from_toml_str("engagement_gap_days = ").is_err());
    }
}
