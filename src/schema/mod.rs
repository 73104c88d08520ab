//! funnel.raw_event.v1 schema
//!
//! This module defines the input record format for folder-movement events
//! and the adapter that reads batches of them.

mod adapter;
mod raw_event;

pub use adapter::*;
pub use raw_event::*;
