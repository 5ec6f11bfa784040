mod bootstrap;

use anyhow::{bail, Result};
use ranking_core::error::RankingError;
use ranking_core::settings::Settings;
use ranking_runtime::pipeline::PipelineRunner;
use ranking_runtime::reporting::{FacadeResponse, ReportingService};
use ranking_runtime::warehouse::SqliteWarehouse;

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Manufacturer Ranker v{} starting", env!("CARGO_PKG_VERSION"));

    match settings.mode.as_str() {
        "rank" => run_rank(&settings),
        "health" | "dashboard" => run_report(&settings),
        unknown => bail!("Unknown mode: {}", unknown),
    }
}

fn run_rank(settings: &Settings) -> Result<()> {
    let runner = PipelineRunner::new(settings.pipeline_config()?);
    tracing::info!(
        "Ranking {} against {}",
        runner.config().events_path.display(),
        runner.config().devices_path.display()
    );

    let run = runner.run()?;

    let summary = &run.summary;
    tracing::info!(
        "Ranked {} manufacturers over {} events (Class I: {}, Class II: {}, Class III: {})",
        summary.total_manufacturers,
        summary.total_events,
        summary.total_class_i,
        summary.total_class_ii,
        summary.total_class_iii
    );
    if run.metadata.events_discarded > 0 {
        tracing::info!(
            "{} events referenced manufacturers outside the devices extract",
            run.metadata.events_discarded
        );
    }
    if let Some(report) = &run.published {
        tracing::info!("Published {} documents", report.published.len());
    }

    Ok(())
}

fn run_report(settings: &Settings) -> Result<()> {
    let Some(path) = settings.warehouse.as_ref() else {
        return Err(RankingError::Config(format!(
            "--mode {} requires --warehouse or RANKER_WAREHOUSE",
            settings.mode
        ))
        .into());
    };

    let service = ReportingService::new(SqliteWarehouse::new(path));
    let FacadeResponse { ok, body } = if settings.mode == "health" {
        service.health()
    } else {
        service.dashboard()
    };

    println!("{}", serde_json::to_string_pretty(&body)?);

    if !ok {
        bail!("{} request failed against {}", settings.mode, path.display());
    }
    Ok(())
}
