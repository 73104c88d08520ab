//! Error types for Funnel Flux

use thiserror::Error;

/// Errors that can occur while building a funnel report
#[derive(Debug, Error)]
pub enum FunnelError {
    #[error("Failed to parse event log: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid transition definition: {0}")]
    InvalidTransition(String),

    #[error("Invalid population filter: {0}")]
    InvalidFilter(String),

    #[error("Candidate index is inconsistent: {0}")]
    InconsistentIndex(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
