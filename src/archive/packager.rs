use crate::error::Result;
use crate::utils::filename::zip_path_for;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zips a directory tree into a sibling `{dir}.zip`.
pub struct ArchivePackager {
    compression: CompressionMethod,
}

impl ArchivePackager {
    pub fn new() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }

    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    /// Write `{dir}.zip` with every file under `dir`, paths relative to `dir`.
    /// The archive is built in a temporary file and moved into place, so an
    /// interrupted run never leaves a half-written zip behind.
    pub fn package(&self, dir: &Path) -> Result<PathBuf> {
        let zip_path = zip_path_for(dir);
        let parent = zip_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        collect_tree(dir, dir, &mut files, &mut dirs)?;

        let staging = NamedTempFile::new_in(parent)?;
        {
            let mut zip = ZipWriter::new(BufWriter::new(staging.as_file()));
            let options = FileOptions::default().compression_method(self.compression);

            for rel in &dirs {
                zip.add_directory(archive_name(rel), options)?;
            }
            for rel in &files {
                zip.start_file(archive_name(rel), options)?;
                let mut source = BufReader::new(File::open(dir.join(rel))?);
                io::copy(&mut source, &mut zip)?;
            }

            zip.finish()?.flush()?;
        }

        staging.persist(&zip_path).map_err(|e| e.error)?;

        info!(
            archive = %zip_path.display(),
            files = files.len(),
            "Packaged working directory"
        );
        Ok(zip_path)
    }
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `dir`, recording file and directory paths relative to `root` in a
/// stable order.
fn collect_tree(
    root: &Path,
    dir: &Path,
    files: &mut Vec<PathBuf>,
    dirs: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        if path.is_dir() {
            dirs.push(rel.to_path_buf());
            collect_tree(root, &path, files, dirs)?;
        } else if path.is_file() {
            files.push(rel.to_path_buf());
        }
    }

    Ok(())
}

/// Zip entry names always use `/`.
fn archive_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
