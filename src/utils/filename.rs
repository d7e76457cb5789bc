use crate::utils::constants::{WORKDIR_PREFIX, ZIP_EXTENSION};
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Working directory name for a run started at `started`: data_{YYYYMMDD-HHMMSS}
pub fn working_dir_name(started: &DateTime<Utc>) -> String {
    format!("{}{}", WORKDIR_PREFIX, started.format("%Y%m%d-%H%M%S"))
}

/// Sibling zip archive path for a directory: `/a/b/dir` -> `/a/b/dir.zip`
pub fn zip_path_for(dir: &Path) -> PathBuf {
    // Rebuilding from components drops any trailing separator
    let normalized: PathBuf = dir.components().collect();
    let mut name = OsString::from(normalized.as_os_str());
    name.push(".");
    name.push(ZIP_EXTENSION);
    PathBuf::from(name)
}
