//! Runtime layer for the manufacturer ranker.
//!
//! Drives a ranking run end to end (analysis, document output, publishing)
//! and serves the live reporting queries over the warehouse.

pub mod pipeline;
pub mod publish;
pub mod reporting;
pub mod warehouse;

pub use ranking_core as core;
pub use ranking_data as data;
