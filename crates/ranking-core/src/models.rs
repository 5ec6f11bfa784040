use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RankingError;

/// Severity tier of a regulatory action. Class I is the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeverityClass {
    ClassI,
    ClassII,
    ClassIII,
}

impl SeverityClass {
    /// All tiers, most severe first.
    pub const ALL: [SeverityClass; 3] = [Self::ClassI, Self::ClassII, Self::ClassIII];

    /// Name of the boolean flag column carrying this tier in the events
    /// extract.
    pub fn flag_column(self) -> &'static str {
        match self {
            Self::ClassI => "action_classification_Class I",
            Self::ClassII => "action_classification_Class II",
            Self::ClassIII => "action_classification_Class III",
        }
    }
}

/// Independent per-tier flags of one event. More than one flag may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassFlags {
    pub class_i: bool,
    pub class_ii: bool,
    pub class_iii: bool,
}

impl ClassFlags {
    /// Whether the flag for `class` is set.
    pub fn is_set(&self, class: SeverityClass) -> bool {
        match class {
            SeverityClass::ClassI => self.class_i,
            SeverityClass::ClassII => self.class_ii,
            SeverityClass::ClassIII => self.class_iii,
        }
    }

    /// Set the flag for `class`.
    pub fn set(&mut self, class: SeverityClass, value: bool) {
        match class {
            SeverityClass::ClassI => self.class_i = value,
            SeverityClass::ClassII => self.class_ii = value,
            SeverityClass::ClassIII => self.class_iii = value,
        }
    }
}

/// One reported incident read from the events extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Manufacturer the incident is attributed to.
    pub manufacturer_id: u64,
    /// Action classification flags.
    pub flags: ClassFlags,
}

impl EventRecord {
    pub fn new(manufacturer_id: u64, flags: ClassFlags) -> Self {
        Self {
            manufacturer_id,
            flags,
        }
    }
}

/// Incident counts for one manufacturer.
///
/// The serialized key names and their order are what the dashboard client
/// reads, so they must not change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerStat {
    /// Events flagged Class I.
    #[serde(rename = "Class_I")]
    pub class_i_count: u64,
    /// Events flagged Class II.
    #[serde(rename = "Class_II")]
    pub class_ii_count: u64,
    /// Events flagged Class III.
    #[serde(rename = "Class_III")]
    pub class_iii_count: u64,
    /// Qualifying events, counted once each regardless of flags.
    pub total_events: u64,
    /// Manufacturer identifier (unique key).
    pub manufacturer_id: u64,
}

impl ManufacturerStat {
    /// Zero-initialised stat for `manufacturer_id`.
    pub fn new(manufacturer_id: u64) -> Self {
        Self {
            manufacturer_id,
            ..Default::default()
        }
    }

    /// Count one qualifying event.
    pub fn record(&mut self, flags: &ClassFlags) {
        self.total_events += 1;
        if flags.class_i {
            self.class_i_count += 1;
        }
        if flags.class_ii {
            self.class_ii_count += 1;
        }
        if flags.class_iii {
            self.class_iii_count += 1;
        }
    }

    /// Sort key for worst-first ranking: (I, II, III).
    pub fn severity_key(&self) -> (u64, u64, u64) {
        (self.class_i_count, self.class_ii_count, self.class_iii_count)
    }

    /// Sort key for best-first ranking: (III, II, I).
    pub fn mildness_key(&self) -> (u64, u64, u64) {
        (self.class_iii_count, self.class_ii_count, self.class_i_count)
    }
}

/// Totals across every manufacturer in a ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_manufacturers: u64,
    pub total_events: u64,
    pub total_class_i: u64,
    pub total_class_ii: u64,
    pub total_class_iii: u64,
}

impl SummaryStats {
    /// Sum the counters of `stats`.
    pub fn from_stats(stats: &[ManufacturerStat]) -> Self {
        stats.iter().fold(
            Self {
                total_manufacturers: stats.len() as u64,
                ..Default::default()
            },
            |mut acc, s| {
                acc.total_events += s.total_events;
                acc.total_class_i += s.class_i_count;
                acc.total_class_ii += s.class_ii_count;
                acc.total_class_iii += s.class_iii_count;
                acc
            },
        )
    }
}

/// Text encodings a source extract may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[serde(rename = "latin-1")]
    Latin1,
    #[serde(rename = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    /// Default fallback order: UTF-8, then Latin-1, then Windows-1252.
    pub const DEFAULT_ORDER: [TextEncoding; 3] = [Self::Utf8, Self::Latin1, Self::Windows1252];

    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Windows1252 => "cp1252",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "cp1252" | "windows-1252" => Ok(Self::Windows1252),
            other => Err(RankingError::UnknownEncoding(other.to_string())),
        }
    }
}
