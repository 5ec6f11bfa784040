//! Loading of the events and devices extracts.
//!
//! Both extracts are CSV files with a header row. Each source is decoded with
//! the first candidate encoding that accepts its bytes, then parsed row by
//! row. Rows that cannot be coerced are dropped; only source-level problems
//! (missing file, undecodable bytes, unusable header) fail the load.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ranking_core::data_processors::{parse_flag, parse_manufacturer_id};
use ranking_core::error::{RankingError, Result};
use ranking_core::models::{ClassFlags, EventRecord, SeverityClass, TextEncoding};
use ranking_core::settings::PipelineConfig;
use tracing::{debug, info};

/// Name of the manufacturer id column in the events extract.
pub const EVENTS_MANUFACTURER_COLUMN: &str = "manufacturer_id";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ── Types ─────────────────────────────────────────────────────────────────────

/// Manufacturer ids known to the devices extract. Built once, then read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceManufacturerSet {
    ids: HashSet<u64>,
}

impl DeviceManufacturerSet {
    pub fn contains(&self, manufacturer_id: u64) -> bool {
        self.ids.contains(&manufacturer_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<u64> for DeviceManufacturerSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Row accounting for one loaded source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub path: PathBuf,
    /// Encoding that decoded the source.
    pub encoding: TextEncoding,
    /// Data rows seen (header excluded).
    pub rows_read: u64,
    /// Rows that produced a usable value.
    pub rows_kept: u64,
    /// Rows skipped because a field could not be coerced.
    pub rows_dropped: u64,
}

impl LoadReport {
    fn new(path: &Path, encoding: TextEncoding) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding,
            rows_read: 0,
            rows_kept: 0,
            rows_dropped: 0,
        }
    }
}

/// Everything the aggregator needs from the two extracts.
#[derive(Debug, Clone)]
pub struct IngestedData {
    /// Events with a usable manufacturer id, in file order.
    pub events: Vec<EventRecord>,
    pub device_manufacturers: DeviceManufacturerSet,
    pub events_report: LoadReport,
    pub devices_report: LoadReport,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load both extracts named in `config`.
///
/// Fails when either source cannot be read; in that case nothing is returned
/// for the other one either.
pub fn load_sources(config: &PipelineConfig) -> Result<IngestedData> {
    info!("Reading events from {}", config.events_path.display());
    let (events, events_report) = load_events(&config.events_path, &config.encodings)?;

    info!("Reading devices from {}", config.devices_path.display());
    let (device_manufacturers, devices_report) =
        load_device_manufacturers(&config.devices_path, &config.encodings)?;

    info!(
        events = events.len(),
        dropped = events_report.rows_dropped,
        "events loaded"
    );
    info!(
        "Found {} unique manufacturer IDs in devices",
        device_manufacturers.len()
    );

    Ok(IngestedData {
        events,
        device_manufacturers,
        events_report,
        devices_report,
    })
}

/// Load the events extract.
///
/// The `manufacturer_id` column is required. The three
/// `action_classification_Class *` columns are optional; a missing column
/// means its flag is never set.
pub fn load_events(
    path: &Path,
    encodings: &[TextEncoding],
) -> Result<(Vec<EventRecord>, LoadReport)> {
    let (text, encoding) = read_source(path, encodings)?;
    let mut report = LoadReport::new(path, encoding);
    let mut reader = csv_reader(&text);

    let headers = read_headers(&mut reader, path)?;
    let id_col = headers
        .iter()
        .position(|h| h == EVENTS_MANUFACTURER_COLUMN)
        .ok_or_else(|| RankingError::DataFormat {
            path: path.to_path_buf(),
            reason: format!("missing column {}", EVENTS_MANUFACTURER_COLUMN),
        })?;
    let flag_cols: Vec<(SeverityClass, Option<usize>)> = SeverityClass::ALL
        .iter()
        .map(|&class| {
            let col = headers.iter().position(|h| h == class.flag_column());
            if col.is_none() {
                debug!("{}: no column {:?}", path.display(), class.flag_column());
            }
            (class, col)
        })
        .collect();

    let mut events = Vec::new();
    for (line, result) in reader.records().enumerate() {
        report.rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("{}: skipping row {}: {}", path.display(), line + 1, e);
                report.rows_dropped += 1;
                continue;
            }
        };

        let Some(manufacturer_id) = record.get(id_col).and_then(parse_manufacturer_id) else {
            debug!(
                "{}: skipping row {} with manufacturer id {:?}",
                path.display(),
                line + 1,
                record.get(id_col)
            );
            report.rows_dropped += 1;
            continue;
        };

        let mut flags = ClassFlags::default();
        for &(class, col) in &flag_cols {
            let set = col.and_then(|c| record.get(c)).map(parse_flag).unwrap_or(false);
            flags.set(class, set);
        }

        events.push(EventRecord::new(manufacturer_id, flags));
        report.rows_kept += 1;
    }

    debug!(
        "File {}: {} read, {} kept, {} dropped ({})",
        path.display(),
        report.rows_read,
        report.rows_kept,
        report.rows_dropped,
        report.encoding,
    );

    Ok((events, report))
}

/// Load the set of manufacturer ids from the leading column of the devices
/// extract. Values that are not non-negative integers are skipped.
pub fn load_device_manufacturers(
    path: &Path,
    encodings: &[TextEncoding],
) -> Result<(DeviceManufacturerSet, LoadReport)> {
    let (text, encoding) = read_source(path, encodings)?;
    let mut report = LoadReport::new(path, encoding);
    let mut reader = csv_reader(&text);
    read_headers(&mut reader, path)?;

    let mut ids = HashSet::new();
    for result in reader.records() {
        report.rows_read += 1;
        match result
            .ok()
            .and_then(|record| record.get(0).and_then(parse_manufacturer_id))
        {
            Some(id) => {
                ids.insert(id);
                report.rows_kept += 1;
            }
            None => report.rows_dropped += 1,
        }
    }

    debug!(
        "File {}: {} read, {} kept, {} dropped ({})",
        path.display(),
        report.rows_read,
        report.rows_kept,
        report.rows_dropped,
        report.encoding,
    );

    Ok((DeviceManufacturerSet { ids }, report))
}

/// Read `path` and decode it with the first encoding in `encodings` that
/// accepts the bytes.
pub fn read_source(path: &Path, encodings: &[TextEncoding]) -> Result<(String, TextEncoding)> {
    let bytes = std::fs::read(path).map_err(|source| RankingError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;

    decode_bytes(&bytes, encodings).ok_or_else(|| RankingError::Decode {
        path: path.to_path_buf(),
        tried: encodings
            .iter()
            .map(|e| e.label())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Decode `bytes` with the first encoding that succeeds.
pub fn decode_bytes(bytes: &[u8], encodings: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    encodings.iter().find_map(|&encoding| {
        let decoded = decode_with(bytes, encoding);
        if decoded.is_none() {
            debug!("source is not valid {}", encoding);
        }
        decoded.map(|text| (text, encoding))
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn decode_with(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    match encoding {
        TextEncoding::Utf8 => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(body)
                .map(|text| text.into_owned())
        }
        TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned()),
    }
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn read_headers(reader: &mut csv::Reader<&[u8]>, path: &Path) -> Result<Vec<String>> {
    let headers = reader.headers().map_err(|e| RankingError::DataFormat {
        path: path.to_path_buf(),
        reason: format!("unreadable header: {}", e),
    })?;
    if headers.is_empty() {
        return Err(RankingError::DataFormat {
            path: path.to_path_buf(),
            reason: "no header row".to_string(),
        });
    }
    Ok(headers.iter().map(|h| h.trim().to_string()).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
