use crate::error::{PipelineError, Result};
use crate::models::{list_canonical_files, CanonicalFile, CatalogEntry, Station};
use crate::utils::constants::{PLOTS_DIR, RAW_EXTENSION};
use crate::utils::filename::{working_dir_name, zip_path_for};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory a run stages its products, plots and archive in.
///
/// Live runs create a fresh `data_{timestamp}` directory under the configured
/// home directory; local-archive runs open an existing directory. The pipeline
/// never deletes it.
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    root: PathBuf,
}

impl WorkingDirectory {
    /// Create `{home}/data_{YYYYMMDD-HHMMSS}` for a run started at `started`.
    /// An existing directory of the same name is reused.
    pub fn create(home: &Path, started: &DateTime<Utc>) -> Result<Self> {
        let root = home.join(working_dir_name(started));
        fs::create_dir_all(&root)?;
        info!(path = %root.display(), "Working directory ready");
        Ok(Self { root })
    }

    /// Open an existing directory of previously inflated products.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(PipelineError::Config(format!(
                "archive directory not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            root: path.components().collect(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.root.join(PLOTS_DIR)
    }

    pub fn ensure_plots_dir(&self) -> Result<PathBuf> {
        let plots = self.plots_dir();
        if !plots.exists() {
            fs::create_dir(&plots)?;
            debug!(path = %plots.display(), "Created plots directory");
        }
        Ok(plots)
    }

    /// Sibling archive path, `{root}.zip`.
    pub fn zip_path(&self) -> PathBuf {
        zip_path_for(&self.root)
    }

    pub fn raw_path(&self, entry: &CatalogEntry) -> PathBuf {
        self.root.join(entry.raw_file_name())
    }

    /// Downloaded products still awaiting inflation, sorted by name.
    pub fn raw_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_raw = path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext == RAW_EXTENSION);
            if is_raw {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn canonical_files(&self, station: &Station) -> Result<Vec<CanonicalFile>> {
        list_canonical_files(station, &self.root)
    }
}
