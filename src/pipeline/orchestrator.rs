use crate::archive::{ArchivePackager, WorkingDirectory};
use crate::catalog::{CatalogScanner, RetrievalManager};
use crate::config::Settings;
use crate::decoder::Decoder;
use crate::error::{PipelineError, Result};
use crate::models::{PipelineWarning, Station, StormMotion, TimeWindow, WindVector};
use crate::processors::{ArchiveRepair, InflationAdapter};
use crate::render::{RenderRequest, Renderer};
use crate::utils::progress::ProgressReporter;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum RunMode {
    /// Scan, download and inflate a window of products
    Live { window: TimeWindow },
    /// Repair and plot an existing directory of canonical files
    LocalArchive { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub station: Station,
    pub mode: RunMode,
    pub storm_motion: StormMotion,
    pub surface_wind: Option<WindVector>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub station: String,
    pub working_dir: PathBuf,
    pub archive_path: PathBuf,
    pub frames: usize,
    pub plots: Vec<PathBuf>,
    pub downloaded: usize,
    pub already_present: usize,
    pub inflated: usize,
    pub renamed: usize,
    pub warnings: Vec<PipelineWarning>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing to process; no directory, plots or archive were produced
    NoDataFound { warnings: Vec<PipelineWarning> },
    Completed(RunSummary),
}

impl RunOutcome {
    pub fn warnings(&self) -> &[PipelineWarning] {
        match self {
            RunOutcome::NoDataFound { warnings } => warnings,
            RunOutcome::Completed(summary) => &summary.warnings,
        }
    }
}

/// Sequences a run: scan, fetch and inflate (live) or repair (local
/// archive), then render and package.
pub struct PipelineOrchestrator<D: Decoder, R: Renderer> {
    scanner: CatalogScanner,
    retrieval: RetrievalManager,
    stages: Arc<LocalStages<D, R>>,
}

/// The filesystem and subprocess half of a run. Everything here blocks, so
/// the orchestrator hands it to tokio's blocking pool.
struct LocalStages<D: Decoder, R: Renderer> {
    inflation: InflationAdapter<D>,
    repair: ArchiveRepair,
    packager: ArchivePackager,
    renderer: R,
    render_output_dir: Option<PathBuf>,
}

impl<D: Decoder + 'static, R: Renderer + 'static> PipelineOrchestrator<D, R> {
    pub fn new(settings: &Settings, decoder: D, renderer: R) -> Result<Self> {
        let client = settings.http_client()?;

        Ok(Self {
            scanner: CatalogScanner::new(client.clone(), settings)?,
            retrieval: RetrievalManager::new(client, settings),
            stages: Arc::new(LocalStages {
                inflation: InflationAdapter::new(decoder, settings.inflate_workers),
                repair: ArchiveRepair::new(),
                packager: ArchivePackager::new(),
                renderer,
                render_output_dir: settings.renderer.output_dir.clone(),
            }),
        })
    }

    pub fn scanner(&self) -> &CatalogScanner {
        &self.scanner
    }

    pub async fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunOutcome> {
        match &request.mode {
            RunMode::Live { window } => self.run_live(request, window, cancel, progress).await,
            RunMode::LocalArchive { dir } => {
                let request = request.clone();
                let dir = dir.clone();
                let cancel = cancel.clone();
                self.blocking(progress, move |stages, progress| {
                    stages.run_local(&request, &dir, &cancel, progress)
                })
                .await
            }
        }
    }

    async fn run_live(
        &self,
        request: &RunRequest,
        window: &TimeWindow,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunOutcome> {
        let station = &request.station;
        if let Some(p) = progress {
            p.set_message(&format!("Scanning catalog for {}...", station.id));
        }

        let scan = self.scanner.discover(station, window, cancel).await?;
        let mut warnings = scan.warnings;

        if !scan.entries.iter().any(|e| window.contains(&e.valid_time())) {
            info!(station = %station.id, window = %window, "No data found");
            return Ok(RunOutcome::NoDataFound { warnings });
        }

        let workdir = self.retrieval.create_working_dir()?;
        let fetched = self
            .retrieval
            .fetch_into(&workdir, station, &scan.entries, window, cancel, progress)
            .await?;
        warnings.extend(fetched.warnings.iter().cloned());

        let summary = RunSummary {
            station: station.id.clone(),
            working_dir: workdir.path().to_path_buf(),
            downloaded: fetched.downloaded(),
            already_present: fetched.already_present(),
            warnings,
            ..RunSummary::default()
        };

        let request = request.clone();
        let cancel = cancel.clone();
        self.blocking(progress, move |stages, progress| {
            let mut summary = summary;
            let inflated = stages
                .inflation
                .inflate(&request.station, &workdir, &cancel, progress)?;
            summary.inflated = inflated.inflated();
            summary.warnings.extend(inflated.warnings.iter().cloned());

            stages
                .stage(&request, &workdir, summary, &cancel, progress)
                .map(RunOutcome::Completed)
        })
        .await
    }

    /// Run `work` on the blocking pool with a shared handle to the progress
    /// display.
    async fn blocking<T, F>(&self, progress: Option<&ProgressReporter>, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&LocalStages<D, R>, Option<&ProgressReporter>) -> Result<T> + Send + 'static,
    {
        let stages = Arc::clone(&self.stages);
        let progress = progress.map(ProgressReporter::share);
        tokio::task::spawn_blocking(move || work(&stages, progress.as_ref())).await?
    }
}

impl<D: Decoder, R: Renderer> LocalStages<D, R> {
    fn run_local(
        &self,
        request: &RunRequest,
        dir: &Path,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunOutcome> {
        let station = &request.station;
        let workdir = WorkingDirectory::open(dir)?;
        if let Some(p) = progress {
            p.set_message(&format!("Repairing {}...", workdir.path().display()));
        }

        let repaired = self.repair.repair(station, workdir.path())?;
        if workdir.canonical_files(station)?.is_empty() {
            info!(station = %station.id, dir = %workdir.path().display(), "No data found");
            return Ok(RunOutcome::NoDataFound {
                warnings: repaired.warnings,
            });
        }

        let summary = RunSummary {
            station: station.id.clone(),
            working_dir: workdir.path().to_path_buf(),
            renamed: repaired.renamed.len(),
            warnings: repaired.warnings,
            ..RunSummary::default()
        };
        self.stage(request, &workdir, summary, cancel, progress)
            .map(RunOutcome::Completed)
    }

    /// Render every frame and the composite into `plots/`, then zip the
    /// working directory. Runs only once all products are in place.
    fn stage(
        &self,
        request: &RunRequest,
        workdir: &WorkingDirectory,
        mut summary: RunSummary,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunSummary> {
        let station = &request.station;
        let plots_dir = workdir.ensure_plots_dir()?;
        let frames = workdir.canonical_files(station)?;
        summary.frames = frames.len();

        let render = RenderRequest {
            station: station.clone(),
            data_dir: workdir.path().to_path_buf(),
            output_dir: self
                .render_output_dir
                .clone()
                .unwrap_or_else(|| workdir.path().to_path_buf()),
            storm_motion: request.storm_motion,
            surface_wind: request.surface_wind,
        };

        if let Some(p) = progress {
            p.set_length(frames.len() as u64 + 1);
            p.set_message(&format!("Rendering {} frames...", frames.len()));
        }

        for frame in &frames {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let target = format!("hodograph {}", frame.stamp());
            let dest = plots_dir.join(format!("{}_{}_vad.png", station.id, frame.stamp()));
            let result = self
                .renderer
                .render_hodograph(&render, frame)
                .and_then(|image| relocate(&image, &dest).map_err(PipelineError::from));
            record_plot(&mut summary, target, dest, result);

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let dest = plots_dir.join(format!("{}_vwp.png", station.id));
        let result = self
            .renderer
            .render_time_height(&render)
            .and_then(|image| relocate(&image, &dest).map_err(PipelineError::from));
        record_plot(&mut summary, "time-height composite".to_string(), dest, result);

        if let Some(p) = progress {
            p.increment(1);
            p.set_message("Packaging...");
        }

        summary.archive_path = self.packager.package(workdir.path())?;

        info!(
            station = %station.id,
            archive = %summary.archive_path.display(),
            frames = summary.frames,
            plots = summary.plots.len(),
            warnings = summary.warnings.len(),
            "Run complete"
        );
        Ok(summary)
    }
}

fn record_plot(summary: &mut RunSummary, target: String, dest: PathBuf, result: Result<()>) {
    match result {
        Ok(()) => {
            info!(plot = %dest.display(), "Plot ready");
            summary.plots.push(dest);
        }
        Err(e) => {
            warn!(%target, error = %e, "Rendering failed");
            summary.warnings.push(PipelineWarning::RenderFailed {
                target,
                reason: e.to_string(),
            });
        }
    }
}

/// Move an image into place, copying when a rename crosses filesystems.
fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    if from == to {
        return Ok(());
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalFile, RadarCategory};
    use crate::render::DisabledRenderer;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct StubRenderer;

    impl Renderer for StubRenderer {
        fn render_hodograph(&self, request: &RenderRequest, _frame: &CanonicalFile) -> Result<PathBuf> {
            let path = request.hodograph_path();
            fs::write(&path, b"png")?;
            Ok(path)
        }

        fn render_time_height(&self, request: &RenderRequest) -> Result<PathBuf> {
            let path = request.time_height_path();
            fs::write(&path, b"png")?;
            Ok(path)
        }
    }

    fn identity(raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn local_request(dir: &Path) -> RunRequest {
        RunRequest {
            station: Station::new("KTLX", RadarCategory::Nexrad, "OUN"),
            mode: RunMode::LocalArchive {
                dir: dir.to_path_buf(),
            },
            storm_motion: StormMotion::default(),
            surface_wind: None,
        }
    }

    #[tokio::test]
    async fn test_local_archive_run() -> Result<()> {
        let home = TempDir::new()?;
        let dir = home.path().join("archive");
        fs::create_dir(&dir)?;
        fs::write(dir.join("KOUN_SDUS54_NVWTLX_202006010015"), b"a")?;
        fs::write(dir.join("KOUN_SDUS34_NVWTLX_202006010215"), b"b")?;

        let orchestrator = PipelineOrchestrator::new(&Settings::default(), identity, StubRenderer)?;
        let outcome = orchestrator
            .run(&local_request(&dir), &CancellationToken::new(), None)
            .await?;

        let RunOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.renamed, 1);
        assert_eq!(summary.frames, 2);
        assert!(summary.warnings.is_empty());
        assert_eq!(
            summary.plots,
            vec![
                dir.join("plots").join("KTLX_202006010015_vad.png"),
                dir.join("plots").join("KTLX_202006010215_vad.png"),
                dir.join("plots").join("KTLX_vwp.png"),
            ]
        );
        assert_eq!(summary.archive_path, home.path().join("archive.zip"));
        assert!(summary.archive_path.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn test_local_archive_without_products_finds_no_data() -> Result<()> {
        let home = TempDir::new()?;
        fs::write(home.path().join("notes.txt"), b"x")?;

        let orchestrator =
            PipelineOrchestrator::new(&Settings::default(), identity, DisabledRenderer)?;
        let outcome = orchestrator
            .run(&local_request(home.path()), &CancellationToken::new(), None)
            .await?;

        assert!(matches!(outcome, RunOutcome::NoDataFound { .. }));
        assert!(!home.path().join("plots").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_render_failures_become_warnings() -> Result<()> {
        let home = TempDir::new()?;
        fs::write(home.path().join("KOUN_SDUS34_NVWTLX_202006010015"), b"a")?;

        let orchestrator =
            PipelineOrchestrator::new(&Settings::default(), identity, DisabledRenderer)?;
        let outcome = orchestrator
            .run(&local_request(home.path()), &CancellationToken::new(), None)
            .await?;

        let RunOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        assert!(summary.plots.is_empty());
        assert_eq!(summary.warnings.len(), 2);
        assert!(summary
            .warnings
            .iter()
            .all(|w| matches!(w, PipelineWarning::RenderFailed { .. })));
        assert!(summary.archive_path.is_file());
        Ok(())
    }

    struct ThreadRecorder(Arc<std::sync::Mutex<Vec<std::thread::ThreadId>>>);

    impl Renderer for ThreadRecorder {
        fn render_hodograph(&self, request: &RenderRequest, _frame: &CanonicalFile) -> Result<PathBuf> {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(std::thread::current().id());
            }
            let path = request.hodograph_path();
            fs::write(&path, b"png")?;
            Ok(path)
        }

        fn render_time_height(&self, request: &RenderRequest) -> Result<PathBuf> {
            let path = request.time_height_path();
            fs::write(&path, b"png")?;
            Ok(path)
        }
    }

    #[tokio::test]
    async fn test_rendering_runs_off_the_runtime_thread() -> Result<()> {
        let home = TempDir::new()?;
        fs::write(home.path().join("KOUN_SDUS34_NVWTLX_202006010015"), b"a")?;

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let orchestrator = PipelineOrchestrator::new(
            &Settings::default(),
            identity,
            ThreadRecorder(Arc::clone(&seen)),
        )?;
        orchestrator
            .run(&local_request(home.path()), &CancellationToken::new(), None)
            .await?;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_ne!(seen[0], std::thread::current().id());
        Ok(())
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() -> Result<()> {
        let outcome = RunOutcome::NoDataFound {
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&outcome)?;
        assert_eq!(json["status"], "no_data_found");
        Ok(())
    }
}
