//! Data layer of the manufacturer ranking pipeline.
//!
//! Reads the events and devices extracts, aggregates incidents per
//! manufacturer and builds the ranked output documents.

pub mod aggregator;
pub mod analysis;
pub mod ranking;
pub mod reader;

pub use ranking_core as core;
