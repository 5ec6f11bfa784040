//! Worst-first / best-first ordering and the two output documents.
//!
//! Both orders are stable sorts over the aggregator's first-seen order, so
//! manufacturers with identical (I, II, III) counts keep the order in which
//! their first qualifying event appeared in the events extract.

use std::cmp::Reverse;

use ranking_core::models::{ManufacturerStat, SummaryStats};
use serde::{Deserialize, Serialize};

const DESCRIPTION: &str = "Manufacturer rankings based on action classification priority";
const PRIORITY_ORDER: &str = "Class I > Class II > Class III (Class I is most severe)";
const DATA_SOURCE: &str = "Events and Devices CSV files merged on manufacturer_id";
const WORST_DESCRIPTION: &str = "Manufacturers with highest Class I incidents (most severe)";
const WORST_CRITERIA: &str = "Sorted by Class I → Class II → Class III (descending)";
const BEST_DESCRIPTION: &str = "Manufacturers with highest Class III incidents (least severe)";
const BEST_CRITERIA: &str = "Sorted by Class III → Class II → Class I (descending)";
const ALL_DESCRIPTION: &str = "Complete list of all manufacturers with their incident counts";

// ── RankingResult ─────────────────────────────────────────────────────────────

/// Both orders over one materialised collection of stats, plus its totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingResult {
    worst_first: Vec<ManufacturerStat>,
    best_first: Vec<ManufacturerStat>,
    all: Vec<ManufacturerStat>,
    summary: SummaryStats,
}

impl RankingResult {
    /// Rank `stats`, which must be in first-seen order.
    pub fn from_stats(stats: Vec<ManufacturerStat>) -> Self {
        let mut worst_first = stats.clone();
        worst_first.sort_by_key(|s| Reverse(s.severity_key()));

        let mut best_first = stats.clone();
        best_first.sort_by_key(|s| Reverse(s.mildness_key()));

        let summary = SummaryStats::from_stats(&stats);

        Self {
            worst_first,
            best_first,
            all: stats,
            summary,
        }
    }

    /// Ordered by (Class I, Class II, Class III), descending.
    pub fn worst_first(&self) -> &[ManufacturerStat] {
        &self.worst_first
    }

    /// Ordered by (Class III, Class II, Class I), descending.
    pub fn best_first(&self) -> &[ManufacturerStat] {
        &self.best_first
    }

    /// Unordered collection, in first-seen order.
    pub fn all(&self) -> &[ManufacturerStat] {
        &self.all
    }

    pub fn summary(&self) -> &SummaryStats {
        &self.summary
    }

    /// Full document with every manufacturer in each list.
    pub fn rankings_document(&self) -> RankingsDocument {
        RankingsDocument {
            metadata: RankingMetadata {
                description: DESCRIPTION.to_string(),
                priority_order: PRIORITY_ORDER.to_string(),
                total_manufacturers: self.all.len() as u64,
                data_source: DATA_SOURCE.to_string(),
            },
            worst_manufacturers: RankedList {
                description: WORST_DESCRIPTION.to_string(),
                ranking_criteria: WORST_CRITERIA.to_string(),
                manufacturers: self.worst_first.clone(),
            },
            best_manufacturers: RankedList {
                description: BEST_DESCRIPTION.to_string(),
                ranking_criteria: BEST_CRITERIA.to_string(),
                manufacturers: self.best_first.clone(),
            },
            all_manufacturers: ManufacturerList {
                description: ALL_DESCRIPTION.to_string(),
                manufacturers: self.all.clone(),
            },
        }
    }

    /// Dashboard document: the first `limit` entries of each order plus the
    /// totals over every manufacturer.
    pub fn dashboard_document(&self, limit: usize) -> DashboardDocument {
        DashboardDocument {
            worst_manufacturers: self.worst_first.iter().take(limit).cloned().collect(),
            best_manufacturers: self.best_first.iter().take(limit).cloned().collect(),
            summary_stats: self.summary.clone(),
        }
    }
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// `manufacturer_rankings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingsDocument {
    pub metadata: RankingMetadata,
    pub worst_manufacturers: RankedList,
    pub best_manufacturers: RankedList,
    pub all_manufacturers: ManufacturerList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingMetadata {
    pub description: String,
    pub priority_order: String,
    pub total_manufacturers: u64,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedList {
    pub description: String,
    pub ranking_criteria: String,
    pub manufacturers: Vec<ManufacturerStat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerList {
    pub description: String,
    pub manufacturers: Vec<ManufacturerStat>,
}

/// `dashboard_data.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardDocument {
    pub worst_manufacturers: Vec<ManufacturerStat>,
    pub best_manufacturers: Vec<ManufacturerStat>,
    pub summary_stats: SummaryStats,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
