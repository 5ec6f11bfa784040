use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the manufacturer ranking pipeline.
#[derive(Error, Debug)]
pub enum RankingError {
    /// A dataset could not be opened or read from disk.
    #[error("Failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the candidate encodings could decode the dataset.
    #[error("Failed to decode {path} with any of [{tried}]")]
    Decode { path: PathBuf, tried: String },

    /// The dataset decoded but its structure is unusable (no header, missing
    /// required column).
    #[error("Malformed source {path}: {reason}")]
    DataFormat { path: PathBuf, reason: String },

    /// An encoding label is not one of the supported encodings.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// A generated document could not be written to the output directory.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A generated document could not be copied into the publish directory.
    #[error("Failed to publish {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reporting query failed against the warehouse.
    #[error("Query failed: {0}")]
    Query(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be serialized or parsed.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the ranking crates.
pub type Result<T> = std::result::Result<T, RankingError>;
