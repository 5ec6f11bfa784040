use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RankingError, Result};
use crate::models::TextEncoding;

/// Default number of manufacturers kept in each dashboard list.
pub const DEFAULT_DASHBOARD_LIMIT: usize = 20;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Rank device manufacturers by the severity of reported incidents
#[derive(Parser, Debug, Clone)]
#[command(
    name = "manufacturer-ranker",
    about = "Rank device manufacturers by the severity of reported incidents",
    version
)]
pub struct Settings {
    /// What to run: build and publish the rankings, or query the warehouse
    #[arg(long, default_value = "rank", value_parser = ["rank", "health", "dashboard"])]
    pub mode: String,

    /// Directory holding the source extracts
    #[arg(long, default_value = "src")]
    pub data_dir: PathBuf,

    /// Events extract file name, relative to the data directory
    #[arg(long, default_value = "events_cleaned.csv")]
    pub events_file: String,

    /// Devices extract file name, relative to the data directory
    #[arg(long, default_value = "device_cleaned.csv")]
    pub devices_file: String,

    /// Directory the ranking documents are generated into
    #[arg(long, default_value = "src")]
    pub output_dir: PathBuf,

    /// Directory served to the web client
    #[arg(long, default_value = "public")]
    pub publish_dir: PathBuf,

    /// Skip copying the documents into the publish directory
    #[arg(long)]
    pub no_publish: bool,

    /// Candidate source encodings, tried in order
    #[arg(long, value_delimiter = ',', default_value = "utf-8,latin-1,cp1252")]
    pub encodings: Vec<String>,

    /// Entries kept in each dashboard list
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub dashboard_limit: u32,

    /// SQLite warehouse used by the health and dashboard modes
    #[arg(long, env = "RANKER_WAREHOUSE")]
    pub warehouse: Option<PathBuf>,

    /// JSON configuration file (defaults to ~/.manufacturer-ranker/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Optional settings read from a JSON file. Every field is optional; values
/// given explicitly on the command line always win.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encodings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<PathBuf>,
}

impl ConfigFile {
    /// Default location: `~/.manufacturer-ranker/config.json`.
    pub fn default_path() -> PathBuf {
        Self::default_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn default_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".manufacturer-ranker").join("config.json")
    }

    /// Load a config file that the user named explicitly. Any failure is an
    /// error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RankingError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| RankingError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Load the default config file. A missing file yields the default.
    pub fn load_default_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Fully resolved configuration of one ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub events_path: PathBuf,
    pub devices_path: PathBuf,
    pub output_dir: PathBuf,
    /// `None` disables the publish step.
    pub publish_dir: Option<PathBuf>,
    /// Candidate encodings, tried in order.
    pub encodings: Vec<TextEncoding>,
    pub dashboard_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            events_path: PathBuf::from("src").join("events_cleaned.csv"),
            devices_path: PathBuf::from("src").join("device_cleaned.csv"),
            output_dir: PathBuf::from("src"),
            publish_dir: Some(PathBuf::from("public")),
            encodings: TextEncoding::DEFAULT_ORDER.to_vec(),
            dashboard_limit: DEFAULT_DASHBOARD_LIMIT,
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge in the configuration file.
    pub fn load() -> Result<Self> {
        Self::load_impl(std::env::args_os().collect(), &ConfigFile::default_path())
    }

    /// Full implementation: accepts args and the default config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_impl(args: Vec<std::ffi::OsString>, default_config: &Path) -> Result<Self> {
        // Raw ArgMatches are needed to query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        let file = match settings.config.as_deref() {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load_default_from(default_config)?,
        };

        // clap stores the arg id under the field name, not the flag spelling.
        if !is_arg_explicitly_set(&matches, "data_dir") {
            if let Some(v) = file.data_dir {
                settings.data_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "events_file") {
            if let Some(v) = file.events_file {
                settings.events_file = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "devices_file") {
            if let Some(v) = file.devices_file {
                settings.devices_file = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = file.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "publish_dir") {
            if let Some(v) = file.publish_dir {
                settings.publish_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "encodings") {
            if let Some(v) = file.encodings {
                settings.encodings = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "dashboard_limit") {
            if let Some(v) = file.dashboard_limit {
                settings.dashboard_limit = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "warehouse") && settings.warehouse.is_none() {
            settings.warehouse = file.warehouse;
        }

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        Ok(settings)
    }

    /// Resolve the settings into the configuration consumed by the pipeline.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let encodings = self
            .encodings
            .iter()
            .map(|label| label.parse::<TextEncoding>())
            .collect::<Result<Vec<_>>>()?;
        if encodings.is_empty() {
            return Err(RankingError::Config(
                "at least one source encoding is required".to_string(),
            ));
        }
        if self.dashboard_limit == 0 {
            return Err(RankingError::Config(
                "dashboard limit must be positive".to_string(),
            ));
        }

        Ok(PipelineConfig {
            events_path: self.data_dir.join(&self.events_file),
            devices_path: self.data_dir.join(&self.devices_file),
            output_dir: self.output_dir.clone(),
            publish_dir: (!self.no_publish).then(|| self.publish_dir.clone()),
            encodings,
            dashboard_limit: self.dashboard_limit as usize,
        })
    }
}

// ── Helper: check if an arg was explicitly set ─────────────────────────────────

/// Returns `true` when `name` was supplied on the command line or through its
/// environment variable (not via default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
