//! Funnel Flux - Compute engine for recruiting-funnel conversion metrics
//!
//! Funnel Flux turns a log of candidate folder movements into a funnel summary
//! table through a deterministic pipeline: normalization → population filter →
//! candidate index → transition classification + engagement detection →
//! duration aggregation → report encoding.
//!
//! ## Modules
//!
//! - **Taxonomy**: the fixed set of system folders; anything else is a client folder
//! - **Classifier**: which candidates made a named from → to move
//! - **Engagement**: candidates with long gaps between activities
//! - **Duration**: per-transition average durations, overall and engaged-only
//! - **Report**: the transition catalogue computed over one population
//! - **Pipeline**: one-shot JSON conversion and the stateful [`FunnelProcessor`]

pub mod classifier;
pub mod config;
pub mod duration;
pub mod encoder;
pub mod engagement;
pub mod error;
pub mod filter;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod taxonomy;
pub mod timeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::FunnelConfig;
pub use error::FunnelError;
pub use filter::PopulationFilter;
pub use pipeline::{events_to_funnel_report, FunnelProcessor};
pub use report::{default_catalogue, ReportBuilder};
pub use types::{Event, FolderSpec, FunnelReport, TransitionDefinition, TransitionResult};

// Schema exports
pub use schema::{RawEvent, RawEventAdapter, SCHEMA_VERSION};

/// Version embedded in every report
pub const FUNNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "funnel-flux";
