use crate::error::{PipelineError, Result};
use crate::models::{CatalogEntry, Station};
use crate::utils::constants::{FRAME_STAMP_FORMAT, PRODUCT_TAG, WMO_HEADER};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Canonical file name for a raw product: `{WFO}_SDUS34_NVW{tail}_{YYYYMMDDHHMM}`.
///
/// This name is read back by the plotting side, so it must not change shape.
/// The result depends only on the station and the raw name.
pub fn canonical_name(station: &Station, raw_name: &str) -> Result<String> {
    let entry = CatalogEntry::parse(raw_name)?;
    Ok(canonical_name_for(station, &entry))
}

pub fn canonical_name_for(station: &Station, entry: &CatalogEntry) -> String {
    format!(
        "{}_{}_{}{}_{}",
        station.wfo_marker(),
        WMO_HEADER,
        PRODUCT_TAG,
        station.tail(),
        entry.valid_time().format(FRAME_STAMP_FORMAT)
    )
}

/// Prefix shared by every canonical file of a station, e.g. `KOUN_SDUS34_NVWTLX_`.
/// Sites sharing an office differ only in the tail.
pub fn canonical_prefix(station: &Station) -> String {
    format!(
        "{}_{}_{}{}_",
        station.wfo_marker(),
        WMO_HEADER,
        PRODUCT_TAG,
        station.tail()
    )
}

/// An inflated product on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalFile {
    pub path: PathBuf,
    pub valid_time: DateTime<Utc>,
}

impl CanonicalFile {
    /// Recognise a canonical file for `station` by name; the valid time is the
    /// trailing twelve digits.
    pub fn from_path(station: &Station, path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if !name.starts_with(&canonical_prefix(station)) || name.len() < 12 {
            return None;
        }

        let stamp = name.get(name.len() - 12..)?;
        let naive = NaiveDateTime::parse_from_str(stamp, FRAME_STAMP_FORMAT).ok()?;

        Some(Self {
            path: path.to_path_buf(),
            valid_time: Utc.from_utc_datetime(&naive),
        })
    }

    pub fn stamp(&self) -> String {
        self.valid_time.format(FRAME_STAMP_FORMAT).to_string()
    }
}

/// All canonical files for `station` in `dir`, oldest first.
pub fn list_canonical_files(station: &Station, dir: &Path) -> Result<Vec<CanonicalFile>> {
    if !dir.is_dir() {
        return Err(PipelineError::Config(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(file) = CanonicalFile::from_path(station, &path) {
            files.push(file);
        }
    }

    files.sort_by(|a, b| a.valid_time.cmp(&b.valid_time).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}
