use crate::archive::WorkingDirectory;
use crate::decoder::Decoder;
use crate::error::{PipelineError, Result};
use crate::models::{canonical_name, PipelineWarning, Station};
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InflateOutcome {
    Inflated { canonical: PathBuf, bytes: u64 },
    /// The canonical file was already there; the raw file was dropped
    AlreadyInflated,
    /// The raw file is kept so a later run can retry it
    Failed(PipelineWarning),
}

#[derive(Debug, Default)]
pub struct InflateReport {
    pub outcomes: Vec<(PathBuf, InflateOutcome)>,
    pub warnings: Vec<PipelineWarning>,
}

impl InflateReport {
    pub fn inflated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, InflateOutcome::Inflated { .. }))
            .count()
    }

    pub fn already_inflated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, InflateOutcome::AlreadyInflated))
            .count()
    }
}

/// Turns every raw product in a working directory into its canonical file.
///
/// The canonical file is fully written and renamed into place before the raw
/// file is removed, so an interrupted run can always be resumed.
pub struct InflationAdapter<D: Decoder> {
    decoder: D,
    max_workers: usize,
}

impl<D: Decoder> InflationAdapter<D> {
    pub fn new(decoder: D, max_workers: usize) -> Self {
        Self {
            decoder,
            max_workers: max_workers.max(1),
        }
    }

    pub fn inflate(
        &self,
        station: &Station,
        workdir: &WorkingDirectory,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<InflateReport> {
        let raw_files = workdir.raw_files()?;
        info!(
            station = %station.id,
            files = raw_files.len(),
            workers = self.max_workers,
            "Inflating products"
        );
        if let Some(p) = progress {
            p.set_length(raw_files.len() as u64);
            p.set_message(&format!("Inflating {} products...", raw_files.len()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let results: Vec<Option<(PathBuf, InflateOutcome)>> = pool.install(|| {
            raw_files
                .par_iter()
                .map(|raw| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let outcome = self.inflate_file(station, workdir.path(), raw);
                    if let Some(p) = progress {
                        p.increment(1);
                    }
                    Some((raw.clone(), outcome))
                })
                .collect()
        });

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut report = InflateReport::default();
        for (raw, outcome) in results.into_iter().flatten() {
            if let InflateOutcome::Failed(warning) = &outcome {
                report.warnings.push(warning.clone());
            }
            report.outcomes.push((raw, outcome));
        }

        info!(
            inflated = report.inflated(),
            already_inflated = report.already_inflated(),
            failed = report.warnings.len(),
            "Inflation complete"
        );
        Ok(report)
    }

    fn inflate_file(&self, station: &Station, dir: &Path, raw: &Path) -> InflateOutcome {
        let file = raw
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let failed = |reason: String| {
            warn!(file = %file, %reason, "Inflation failed");
            InflateOutcome::Failed(PipelineWarning::DecodeFailed {
                file: file.clone(),
                reason,
            })
        };

        let name = match canonical_name(station, &file) {
            Ok(name) => name,
            Err(e) => return failed(e.to_string()),
        };
        let canonical = dir.join(&name);

        if canonical.exists() {
            debug!(file = %file, canonical = %name, "Already inflated");
            return match fs::remove_file(raw) {
                Ok(()) => InflateOutcome::AlreadyInflated,
                Err(e) => failed(format!("could not remove raw file: {}", e)),
            };
        }

        let bytes = match fs::read(raw) {
            Ok(bytes) => bytes,
            Err(e) => return failed(format!("could not read raw file: {}", e)),
        };
        let inflated = match self.decoder.decode(&bytes) {
            Ok(inflated) if inflated.is_empty() => {
                return failed("decoder produced no output".to_string())
            }
            Ok(inflated) => inflated,
            Err(e) => return failed(e.to_string()),
        };

        match persist_canonical(dir, &canonical, &inflated) {
            Ok(true) => {}
            Ok(false) => debug!(canonical = %name, "Canonical file appeared concurrently"),
            Err(e) => return failed(format!("could not write {}: {}", name, e)),
        }

        if let Err(e) = fs::remove_file(raw) {
            return failed(format!("could not remove raw file: {}", e));
        }

        debug!(file = %file, canonical = %name, bytes = inflated.len(), "Inflated");
        InflateOutcome::Inflated {
            canonical,
            bytes: inflated.len() as u64,
        }
    }
}

/// Returns `false` when another writer already produced `target`.
fn persist_canonical(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<bool> {
    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(bytes)?;
    staging.as_file().sync_all()?;

    match staging.persist_noclobber(target) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}
