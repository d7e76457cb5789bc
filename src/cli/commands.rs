use crate::catalog::{Availability, CatalogScanner};
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::decoder::ZlibFrameDecoder;
use crate::error::{PipelineError, Result};
use crate::models::{StationRegistry, StormMotion, TimeWindow, WindVector};
use crate::pipeline::{PipelineOrchestrator, RunMode, RunOutcome, RunRequest};
use crate::render::{CommandRenderer, DisabledRenderer, Renderer};
use crate::utils::progress::ProgressReporter;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let settings = Settings::load(cli.config.as_deref())?;
    let registry = StationRegistry::builtin().with_overrides(&settings.stations)?;
    let cancel = cancel_on_ctrl_c();

    match cli.command {
        Commands::Run {
            station,
            start,
            end,
            archive_dir,
            surface_wind,
            storm_motion,
            json,
        } => {
            let request = RunRequest {
                station: registry.resolve(&station)?,
                mode: resolve_mode(start.as_deref(), end.as_deref(), archive_dir)?,
                storm_motion: storm_motion.parse::<StormMotion>()?,
                surface_wind: surface_wind
                    .as_deref()
                    .map(str::parse::<WindVector>)
                    .transpose()?,
            };

            let progress = ProgressReporter::new_spinner("Starting run...", cli.quiet || json);

            let outcome = if settings.renderer.is_configured() {
                let renderer = CommandRenderer::from_settings(&settings.renderer)?;
                execute(&settings, renderer, &request, &cancel, &progress).await?
            } else {
                warn!("No plotting programs configured; plots will be skipped");
                execute(&settings, DisabledRenderer, &request, &cancel, &progress).await?
            };

            progress.finish_with_message("Done");

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
        }

        Commands::Availability { station, json } => {
            let station = registry.resolve(&station)?;
            let scanner = CatalogScanner::new(settings.http_client()?, &settings)?;

            let progress = ProgressReporter::new_spinner(
                &format!("Checking archive for {}...", station.id),
                cli.quiet || json,
            );
            let availability = scanner.availability(&station, Utc::now(), &cancel).await?;
            progress.finish_with_message("Done");

            if json {
                println!("{}", serde_json::to_string_pretty(&availability)?);
            } else {
                print_availability(&station.id, &availability);
            }
        }
    }

    Ok(())
}

async fn execute<R: Renderer + 'static>(
    settings: &Settings,
    renderer: R,
    request: &RunRequest,
    cancel: &CancellationToken,
    progress: &ProgressReporter,
) -> Result<RunOutcome> {
    let orchestrator = PipelineOrchestrator::new(settings, ZlibFrameDecoder::new(), renderer)?;
    orchestrator.run(request, cancel, Some(progress)).await
}

/// Both window ends select live mode, neither selects the local archive.
pub fn resolve_mode(
    start: Option<&str>,
    end: Option<&str>,
    archive_dir: Option<PathBuf>,
) -> Result<RunMode> {
    match (start, end, archive_dir) {
        (Some(_), Some(_), Some(_)) => Err(PipelineError::Config(
            "--archive-dir cannot be combined with a time window".to_string(),
        )),
        (Some(start), Some(end), None) => Ok(RunMode::Live {
            window: TimeWindow::parse(start, end)?,
        }),
        (Some(_), None, _) | (None, Some(_), _) => Err(PipelineError::InvalidWindow(
            "both --start and --end are required for a live run".to_string(),
        )),
        (None, None, Some(dir)) => Ok(RunMode::LocalArchive { dir }),
        (None, None, None) => Err(PipelineError::Config(
            "give --start and --end, or --archive-dir for a local archive".to_string(),
        )),
    }
}

fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose {
        "vwp_fetcher=debug,info"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialisation (tests, embedding) keeps the first subscriber
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            token.cancel();
        }
    });
    cancel
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoDataFound { .. } => {
            println!("No data found");
        }
        RunOutcome::Completed(summary) => {
            println!("\nRun complete for {}", summary.station);
            println!("Working directory: {}", summary.working_dir.display());
            println!("Archive: {}", summary.archive_path.display());
            println!(
                "Frames: {}, downloaded: {}, already present: {}, inflated: {}, renamed: {}",
                summary.frames,
                summary.downloaded,
                summary.already_present,
                summary.inflated,
                summary.renamed
            );
            println!("Plots: {}", summary.plots.len());
            for plot in &summary.plots {
                println!("  {}", plot.display());
            }
        }
    }

    let warnings = outcome.warnings();
    if !warnings.is_empty() {
        println!("\n⚠️  {} warning(s):", warnings.len());
        for warning in warnings {
            println!("  - {}", warning);
        }
    }
    info!(warnings = warnings.len(), "Finished");
}

fn print_availability(station: &str, availability: &Availability) {
    let show = |t: Option<DateTime<Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "none found".to_string())
    };
    println!("Archive availability for {}", station);
    println!("  Oldest scan: {}", show(availability.earliest));
    println!("  Latest scan: {}", show(availability.latest));
}
