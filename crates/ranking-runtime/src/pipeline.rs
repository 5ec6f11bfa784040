//! One ranking run: analyse the extracts, write both documents, publish.
//!
//! Both documents are rendered in memory and staged next to their final
//! paths before either is moved into place. The previous rankings file is
//! kept aside until the dashboard file is committed, so a failed run never
//! leaves a new rankings file without its matching dashboard file.

use std::path::{Path, PathBuf};

use ranking_core::error::{RankingError, Result};
use ranking_core::models::SummaryStats;
use ranking_core::settings::PipelineConfig;
use ranking_data::analysis::{analyze_sources, AnalysisMetadata};
use ranking_data::ranking::RankingResult;
use tracing::{info, warn};

use crate::publish::{publish, PublishReport};

/// File name of the full ranking document.
pub const RANKINGS_FILE_NAME: &str = "manufacturer_rankings.json";

/// File name of the bounded dashboard document.
pub const DASHBOARD_FILE_NAME: &str = "dashboard_data.json";

// ── Public types ──────────────────────────────────────────────────────────────

/// Where a run wrote its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub rankings: PathBuf,
    pub dashboard: PathBuf,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub documents: DocumentPaths,
    pub summary: SummaryStats,
    pub metadata: AnalysisMetadata,
    /// `None` when publishing is disabled.
    pub published: Option<PublishReport>,
}

// ── PipelineRunner ────────────────────────────────────────────────────────────

/// Runs the ranking pipeline for one [`PipelineConfig`].
pub struct PipelineRunner {
    config: PipelineConfig,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyse, write both documents, then publish them when a publish
    /// directory is configured.
    ///
    /// A publish failure is reported as an error but leaves the freshly
    /// written documents in the output directory.
    pub fn run(&self) -> Result<RunSummary> {
        let analysis = analyze_sources(&self.config)?;

        let documents = write_documents(
            &analysis.ranking,
            &self.config.output_dir,
            self.config.dashboard_limit,
        )?;
        info!(
            "Generated {} with {} manufacturers",
            documents.rankings.display(),
            analysis.ranking.all().len()
        );
        info!("Generated {}", documents.dashboard.display());

        let published = match &self.config.publish_dir {
            Some(dir) => Some(publish(&self.config.output_dir, dir)?),
            None => None,
        };

        Ok(RunSummary {
            documents,
            summary: analysis.ranking.summary().clone(),
            metadata: analysis.metadata,
            published,
        })
    }
}

// ── Document output ───────────────────────────────────────────────────────────

/// Render the full and dashboard documents as pretty-printed JSON.
pub fn render_documents(
    ranking: &RankingResult,
    dashboard_limit: usize,
) -> Result<(String, String)> {
    let rankings = serde_json::to_string_pretty(&ranking.rankings_document())?;
    let dashboard = serde_json::to_string_pretty(&ranking.dashboard_document(dashboard_limit))?;
    Ok((rankings, dashboard))
}

/// Write both documents into `output_dir`, all or nothing.
pub fn write_documents(
    ranking: &RankingResult,
    output_dir: &Path,
    dashboard_limit: usize,
) -> Result<DocumentPaths> {
    let (rankings_json, dashboard_json) = render_documents(ranking, dashboard_limit)?;

    std::fs::create_dir_all(output_dir).map_err(|source| RankingError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let paths = DocumentPaths {
        rankings: output_dir.join(RANKINGS_FILE_NAME),
        dashboard: output_dir.join(DASHBOARD_FILE_NAME),
    };

    let staged_rankings = stage(&paths.rankings, &rankings_json)?;
    let staged_dashboard = match stage(&paths.dashboard, &dashboard_json) {
        Ok(p) => p,
        Err(e) => {
            discard(&staged_rankings);
            return Err(e);
        }
    };

    let previous = match back_up(&paths.rankings) {
        Ok(p) => p,
        Err(e) => {
            discard(&staged_rankings);
            discard(&staged_dashboard);
            return Err(e);
        }
    };

    if let Err(e) = commit(&staged_rankings, &paths.rankings) {
        discard(&staged_rankings);
        discard(&staged_dashboard);
        restore(previous.as_deref(), &paths.rankings);
        return Err(e);
    }
    if let Err(e) = commit(&staged_dashboard, &paths.dashboard) {
        discard(&staged_dashboard);
        restore(previous.as_deref(), &paths.rankings);
        return Err(e);
    }

    if let Some(backup) = previous {
        discard(&backup);
    }
    Ok(paths)
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

fn stage(path: &Path, contents: &str) -> Result<PathBuf> {
    let tmp = staging_path(path);
    std::fs::write(&tmp, contents).map_err(|source| RankingError::Write {
        path: tmp.clone(),
        source,
    })?;
    Ok(tmp)
}

fn commit(staged: &Path, path: &Path) -> Result<()> {
    std::fs::rename(staged, path).map_err(|source| RankingError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Move an existing document aside so a failed commit can put it back.
fn back_up(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = path.with_extension("json.bak");
    std::fs::rename(path, &backup).map_err(|source| RankingError::Write {
        path: backup.clone(),
        source,
    })?;
    Ok(Some(backup))
}

/// Undo a partial commit: put `backup` back at `path`, or remove the new
/// document when there was nothing before it.
fn restore(backup: Option<&Path>, path: &Path) {
    let outcome = match backup {
        Some(backup) => std::fs::rename(backup, path),
        None if path.exists() => std::fs::remove_file(path),
        None => Ok(()),
    };
    if let Err(e) = outcome {
        warn!("could not restore {}: {}", path.display(), e);
    }
}

fn discard(staged: &Path) {
    if let Err(e) = std::fs::remove_file(staged) {
        warn!("could not remove staged file {}: {}", staged.display(), e);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ranking_core::models::ManufacturerStat;
    use serde_json::Value;
    use tempfile::TempDir;

    const EVENTS_HEADER: &str = "manufacturer_id,action_classification_Class I,action_classification_Class II,action_classification_Class III";

    fn write_lines(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn config_in(tmp: &TempDir, events: &[String], devices: &[String]) -> PipelineConfig {
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        PipelineConfig {
            events_path: write_lines(&data, "events_cleaned.csv", events),
            devices_path: write_lines(&data, "device_cleaned.csv", devices),
            output_dir: tmp.path().join("out"),
            publish_dir: Some(tmp.path().join("public")),
            ..PipelineConfig::default()
        }
    }

    fn lines(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_run_writes_and_publishes_documents() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(
            &tmp,
            &lines(&[
                EVENTS_HEADER,
                "1,True,False,False",
                "1,False,True,False",
                "2,False,False,True",
                "99,True,False,False",
            ]),
            &lines(&["manufacturer_id,name", "1,Pump", "2,Valve"]),
        );

        let summary = PipelineRunner::new(config).run().unwrap();

        assert_eq!(summary.summary.total_manufacturers, 2);
        assert_eq!(summary.summary.total_events, 3);
        assert_eq!(summary.metadata.events_discarded, 1);

        let dashboard = read_json(&summary.documents.dashboard);
        assert_eq!(dashboard["worst_manufacturers"][0]["manufacturer_id"], 1);
        assert_eq!(dashboard["best_manufacturers"][0]["manufacturer_id"], 2);
        assert_eq!(dashboard["summary_stats"]["total_events"], 3);

        let rankings = read_json(&summary.documents.rankings);
        assert_eq!(rankings["metadata"]["total_manufacturers"], 2);

        let published = summary.published.expect("publish enabled");
        assert_eq!(published.published.len(), 2);
        for path in &published.published {
            let name = path.file_name().unwrap();
            let original = tmp.path().join("out").join(name);
            assert_eq!(std::fs::read(path).unwrap(), std::fs::read(original).unwrap());
        }
    }

    #[test]
    fn test_run_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut events = lines(&[EVENTS_HEADER]);
        for id in 0..40 {
            events.push(format!("{},{},False,{}", id % 13, id % 3 == 0, id % 2 == 0));
        }
        let mut devices = lines(&["manufacturer_id"]);
        devices.extend((0..13).map(|id| id.to_string()));
        let config = config_in(&tmp, &events, &devices);
        let runner = PipelineRunner::new(config);

        let first = runner.run().unwrap();
        let rankings_a = std::fs::read(&first.documents.rankings).unwrap();
        let dashboard_a = std::fs::read(&first.documents.dashboard).unwrap();

        let second = runner.run().unwrap();
        assert_eq!(rankings_a, std::fs::read(&second.documents.rankings).unwrap());
        assert_eq!(dashboard_a, std::fs::read(&second.documents.dashboard).unwrap());
    }

    #[test]
    fn test_failed_run_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(
            &tmp,
            &lines(&[EVENTS_HEADER, "1,True,False,False"]),
            &lines(&["manufacturer_id", "1"]),
        );
        config.devices_path = tmp.path().join("missing.csv");

        let err = PipelineRunner::new(config.clone()).run().unwrap_err();

        assert!(matches!(err, RankingError::SourceRead { .. }));
        assert!(!config.output_dir.join(RANKINGS_FILE_NAME).exists());
        assert!(!config.output_dir.join(DASHBOARD_FILE_NAME).exists());
        assert!(!tmp.path().join("public").exists());
    }

    #[test]
    fn test_run_without_publish_dir() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(
            &tmp,
            &lines(&[EVENTS_HEADER, "1,True,False,False"]),
            &lines(&["manufacturer_id", "1"]),
        );
        config.publish_dir = None;

        let summary = PipelineRunner::new(config).run().unwrap();
        assert!(summary.published.is_none());
        assert!(!tmp.path().join("public").exists());
    }

    #[test]
    fn test_dashboard_limit_applies() {
        let tmp = TempDir::new().unwrap();
        let mut events = lines(&[EVENTS_HEADER]);
        events.extend((1..=21).map(|id| format!("{id},True,False,False")));
        let mut devices = lines(&["manufacturer_id"]);
        devices.extend((1..=21).map(|id| id.to_string()));
        let config = config_in(&tmp, &events, &devices);

        let summary = PipelineRunner::new(config).run().unwrap();

        let dashboard = read_json(&summary.documents.dashboard);
        assert_eq!(dashboard["worst_manufacturers"].as_array().unwrap().len(), 20);
        assert_eq!(dashboard["best_manufacturers"].as_array().unwrap().len(), 20);
        assert_eq!(dashboard["summary_stats"]["total_manufacturers"], 21);

        let rankings = read_json(&summary.documents.rankings);
        assert_eq!(
            rankings["worst_manufacturers"]["manufacturers"]
                .as_array()
                .unwrap()
                .len(),
            21
        );
    }

    #[test]
    fn test_render_documents_pretty_printed() {
        let mut stat = ManufacturerStat::new(3);
        stat.class_i_count = 1;
        stat.total_events = 1;
        let ranking = RankingResult::from_stats(vec![stat]);

        let (rankings, dashboard) = render_documents(&ranking, 20).unwrap();
        assert!(rankings.starts_with("{\n  \"metadata\": {"));
        assert!(dashboard.starts_with("{\n  \"worst_manufacturers\": ["));
        assert!(!rankings.ends_with('\n'));
    }

    #[test]
    fn test_failed_dashboard_commit_restores_previous_rankings() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(RANKINGS_FILE_NAME), "previous").unwrap();
        // A non-empty directory at the dashboard path makes its rename fail.
        let blocker = tmp.path().join(DASHBOARD_FILE_NAME);
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "x").unwrap();
        let ranking = RankingResult::from_stats(vec![ManufacturerStat::new(1)]);

        let err = write_documents(&ranking, tmp.path(), 20).unwrap_err();

        assert!(matches!(err, RankingError::Write { .. }));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(RANKINGS_FILE_NAME)).unwrap(),
            "previous"
        );
        assert!(!tmp.path().join("manufacturer_rankings.json.bak").exists());
        assert!(!tmp.path().join("dashboard_data.json.tmp").exists());
    }

    #[test]
    fn test_failed_first_write_leaves_no_rankings() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join(DASHBOARD_FILE_NAME);
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "x").unwrap();
        let ranking = RankingResult::from_stats(vec![ManufacturerStat::new(1)]);

        assert!(write_documents(&ranking, tmp.path(), 20).is_err());
        assert!(!tmp.path().join(RANKINGS_FILE_NAME).exists());
    }

    #[test]
    fn test_write_documents_replaces_previous_output() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(RANKINGS_FILE_NAME), "previous").unwrap();
        std::fs::write(tmp.path().join(DASHBOARD_FILE_NAME), "previous").unwrap();
        let ranking = RankingResult::from_stats(vec![ManufacturerStat::new(1)]);

        let paths = write_documents(&ranking, tmp.path(), 20).unwrap();

        assert!(read_json(&paths.rankings)["metadata"].is_object());
        assert!(read_json(&paths.dashboard)["summary_stats"].is_object());
        assert!(!tmp.path().join("manufacturer_rankings.json.bak").exists());
    }

    #[test]
    fn test_write_documents_leaves_no_staging_files() {
        let tmp = TempDir::new().unwrap();
        let ranking = RankingResult::from_stats(vec![ManufacturerStat::new(1)]);

        let paths = write_documents(&ranking, tmp.path(), 20).unwrap();

        assert!(paths.rankings.exists());
        assert!(paths.dashboard.exists());
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
