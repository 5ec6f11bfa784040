//! Domain types shared by the manufacturer ranking crates.
//!
//! Holds the event and manufacturer models, the error taxonomy, best-effort
//! field coercion and the CLI/configuration layer.

pub mod data_processors;
pub mod error;
pub mod models;
pub mod settings;
