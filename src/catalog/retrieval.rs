use crate::archive::WorkingDirectory;
use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::models::{canonical_name_for, CatalogEntry, PipelineWarning, Station, TimeWindow};
use crate::utils::constants::{FILE_SERVER_DIR, LEVEL3_DIR, PRODUCT_DIR};
use crate::utils::progress::ProgressReporter;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to one catalog entry during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Downloaded { bytes: u64 },
    /// Raw or canonical file already in the working directory
    AlreadyPresent,
    OutsideWindow,
    Failed(PipelineWarning),
}

#[derive(Debug)]
pub struct FetchReport {
    pub dir: PathBuf,
    pub outcomes: Vec<(CatalogEntry, TransferOutcome)>,
    pub warnings: Vec<PipelineWarning>,
}

impl FetchReport {
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, TransferOutcome::Downloaded { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, TransferOutcome::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TransferOutcome::Failed(_)))
    }

    pub fn in_window(&self) -> usize {
        self.outcomes.len() - self.count(|o| matches!(o, TransferOutcome::OutsideWindow))
    }

    fn count(&self, pred: impl Fn(&TransferOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Downloads the catalog entries that fall inside a window into a working
/// directory. Re-running against the same directory transfers nothing twice.
pub struct RetrievalManager {
    client: reqwest::Client,
    base_url: String,
    max_workers: usize,
    home_dir: PathBuf,
}

impl RetrievalManager {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.base_url().to_string(),
            max_workers: settings.download_workers,
            home_dir: settings.home_dir.clone(),
        }
    }

    /// `{base}/fileServer/{category}/level3/NVW/{tail}/{YYYYMMDD}/{name}.nids`
    pub fn file_url(&self, station: &Station, entry: &CatalogEntry) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}/{}/{}",
            self.base_url,
            FILE_SERVER_DIR,
            station.category.catalog_segment(),
            LEVEL3_DIR,
            PRODUCT_DIR,
            entry.station_tail(),
            entry.day().format("%Y%m%d"),
            entry.raw_file_name()
        )
    }

    /// Create a fresh working directory stamped with the current time.
    pub fn create_working_dir(&self) -> Result<WorkingDirectory> {
        WorkingDirectory::create(&self.home_dir, &Utc::now())
    }

    /// Fetch into a fresh `data_{timestamp}` directory under the home
    /// directory. Every call starts a new directory, so nothing from an
    /// earlier call is reused; resume an interrupted or repeated fetch with
    /// [`RetrievalManager::fetch_into`] on the existing directory.
    pub async fn fetch(
        &self,
        station: &Station,
        entries: &[CatalogEntry],
        window: &TimeWindow,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<FetchReport> {
        let workdir = self.create_working_dir()?;
        self.fetch_into(&workdir, station, entries, window, cancel, progress)
            .await
    }

    /// Download every entry inside `window` into `workdir`. Individual
    /// failures become warnings; only cancellation and local I/O setup
    /// failures abort the fetch.
    pub async fn fetch_into(
        &self,
        workdir: &WorkingDirectory,
        station: &Station,
        entries: &[CatalogEntry],
        window: &TimeWindow,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<FetchReport> {
        let wanted = entries
            .iter()
            .filter(|e| window.contains(&e.valid_time()))
            .count();
        info!(
            station = %station.id,
            dir = %workdir.path().display(),
            listed = entries.len(),
            wanted,
            "Fetching products"
        );
        if let Some(p) = progress {
            p.set_length(wanted as u64);
            p.set_message(&format!("Downloading {} products...", wanted));
        }

        let mut results: Vec<Option<(usize, TransferOutcome)>> =
            stream::iter(entries.iter().enumerate())
                .map(|(index, entry)| async move {
                    if !window.contains(&entry.valid_time()) {
                        return Some((index, TransferOutcome::OutsideWindow));
                    }
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        outcome = self.transfer(workdir, station, entry) => outcome,
                    };
                    if let Some(p) = progress {
                        p.increment(1);
                    }
                    Some((index, outcome))
                })
                .buffer_unordered(self.max_workers)
                .collect()
                .await;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        results.sort_by_key(|r| r.as_ref().map(|(index, _)| *index));

        let mut outcomes = Vec::with_capacity(entries.len());
        let mut warnings = Vec::new();
        for (index, outcome) in results.into_iter().flatten() {
            if let TransferOutcome::Failed(warning) = &outcome {
                warnings.push(warning.clone());
            }
            outcomes.push((entries[index].clone(), outcome));
        }

        let report = FetchReport {
            dir: workdir.path().to_path_buf(),
            outcomes,
            warnings,
        };
        info!(
            downloaded = report.downloaded(),
            already_present = report.already_present(),
            failed = report.failed(),
            "Fetch complete"
        );
        Ok(report)
    }

    async fn transfer(
        &self,
        workdir: &WorkingDirectory,
        station: &Station,
        entry: &CatalogEntry,
    ) -> TransferOutcome {
        let target = workdir.raw_path(entry);
        let canonical = workdir.path().join(canonical_name_for(station, entry));
        if target.exists() || canonical.exists() {
            debug!(file = %entry, "Already present, skipping");
            return TransferOutcome::AlreadyPresent;
        }

        let file = entry.raw_file_name();
        let url = self.file_url(station, entry);
        debug!(%url, "Downloading product");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return transfer_failed(&file, e.to_string()),
        };
        if !response.status().is_success() {
            return transfer_failed(&file, format!("HTTP {} from {}", response.status(), url));
        }

        let expected = response.content_length();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return transfer_failed(&file, e.to_string()),
        };

        let received = body.len() as u64;
        if received == 0 || expected.map_or(false, |len| len != received) {
            warn!(file = %file, ?expected, received, "Transfer incomplete");
            return TransferOutcome::Failed(PipelineWarning::TransferIncomplete {
                file,
                expected,
                received,
            });
        }

        let dir = workdir.path().to_path_buf();
        let written = tokio::task::spawn_blocking(move || persist_new(&dir, &target, &body))
            .await
            .map_err(io::Error::from)
            .and_then(|result| result);

        match written {
            Ok(true) => TransferOutcome::Downloaded { bytes: received },
            Ok(false) => TransferOutcome::AlreadyPresent,
            Err(e) => transfer_failed(&file, format!("could not write file: {}", e)),
        }
    }
}

fn transfer_failed(file: &str, reason: String) -> TransferOutcome {
    warn!(%file, %reason, "Transfer failed");
    TransferOutcome::Failed(PipelineWarning::TransferFailed {
        file: file.to_string(),
        reason,
    })
}

/// Write `bytes` to `target` through a temporary file in `dir`, never
/// replacing an existing file. Returns `false` when `target` appeared first.
fn persist_new(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<bool> {
    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(bytes)?;
    staging.as_file().sync_all()?;

    match staging.persist_noclobber(target) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}
