use crate::error::{PipelineError, Result};
use crate::models::{PipelineWarning, Station};
use crate::utils::constants::WMO_HEADER_CODE;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Files in a local archive that carry a WMO bulletin header.
const HEADER_TAG: &str = "SDUS";

/// Offset of the two-digit header code after the office marker:
/// `KOUN_SDUS` is nine characters, the code follows.
const CODE_OFFSET: usize = 9;
const CODE_LEN: usize = 2;

#[derive(Debug, Default)]
pub struct RepairReport {
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub warnings: Vec<PipelineWarning>,
}

/// Normalises the bulletin header code in the names of previously inflated
/// products (`KOUN_SDUS54_...` becomes `KOUN_SDUS34_...`). Renames in place,
/// without a backup. Running it twice renames nothing the second time.
#[derive(Debug, Default)]
pub struct ArchiveRepair;

impl ArchiveRepair {
    pub fn new() -> Self {
        Self
    }

    pub fn repair(&self, station: &Station, dir: &Path) -> Result<RepairReport> {
        if !dir.is_dir() {
            return Err(PipelineError::Config(format!(
                "archive directory not found: {}",
                dir.display()
            )));
        }

        let marker = station.wfo_marker();
        let mut candidates: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let tagged = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.contains(HEADER_TAG));
            if path.is_file() && tagged {
                candidates.push(path);
            }
        }
        candidates.sort();

        let mut report = RepairReport::default();
        for path in candidates {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let skipped = |reason: String| {
                warn!(path = %path.display(), %reason, "Left file unrepaired");
                PipelineWarning::RepairSkipped {
                    path: path.clone(),
                    reason,
                }
            };

            let fixed = match normalized_name(name, &marker) {
                Ok(Some(fixed)) => fixed,
                Ok(None) => continue,
                Err(reason) => {
                    report.warnings.push(skipped(reason));
                    continue;
                }
            };

            let target = dir.join(&fixed);
            if target.exists() {
                report
                    .warnings
                    .push(skipped(format!("{} already exists", fixed)));
                continue;
            }

            fs::rename(&path, &target)?;
            debug!(from = %name, to = %fixed, "Renamed");
            report.renamed.push((path, target));
        }

        info!(
            station = %station.id,
            renamed = report.renamed.len(),
            skipped = report.warnings.len(),
            "Archive repair complete"
        );
        Ok(report)
    }
}

/// The corrected name for `name`, or `None` when it already carries the
/// canonical header code. Errors name why the file cannot be repaired.
pub fn normalized_name(name: &str, marker: &str) -> std::result::Result<Option<String>, String> {
    let start = name
        .find(marker)
        .ok_or_else(|| format!("no {} office marker", marker))?
        + CODE_OFFSET;
    let end = start + CODE_LEN;

    let code = name
        .get(start..end)
        .ok_or_else(|| "name too short for a header code".to_string())?;
    if code == WMO_HEADER_CODE {
        return Ok(None);
    }
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("header code '{}' is not numeric", code));
    }

    Ok(Some(format!("{}{}{}", &name[..start], WMO_HEADER_CODE, &name[end..])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RadarCategory;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ktlx() -> Station {
        Station::new("KTLX", RadarCategory::Nexrad, "OUN")
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(
            normalized_name("KOUN_SDUS54_NVWTLX_202006010015", "KOUN"),
            Ok(Some("KOUN_SDUS34_NVWTLX_202006010015".to_string()))
        );
        assert_eq!(normalized_name("KOUN_SDUS34_NVWTLX_202006010015", "KOUN"), Ok(None));
        assert!(normalized_name("KFWD_SDUS54_NVWFWS_202006010015", "KOUN").is_err());
        assert!(normalized_name("KOUN_SDUSxx_NVWTLX_202006010015", "KOUN").is_err());
        assert!(normalized_name("KOUN_SDUS", "KOUN").is_err());
    }

    #[test]
    fn test_repair_renames_and_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("KOUN_SDUS54_NVWTLX_202006010015"), b"a")?;
        fs::write(dir.path().join("KOUN_SDUS34_NVWTLX_202006010215"), b"b")?;
        fs::write(dir.path().join("notes.txt"), b"c")?;

        let repair = ArchiveRepair::new();
        let first = repair.repair(&ktlx(), dir.path())?;
        assert_eq!(first.renamed.len(), 1);
        assert!(first.warnings.is_empty());
        assert!(dir.path().join("KOUN_SDUS34_NVWTLX_202006010015").exists());
        assert!(!dir.path().join("KOUN_SDUS54_NVWTLX_202006010015").exists());

        let second = repair.repair(&ktlx(), dir.path())?;
        assert!(second.renamed.is_empty());
        assert!(second.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn test_repair_never_overwrites() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("KOUN_SDUS54_NVWTLX_202006010015"), b"stale")?;
        fs::write(dir.path().join("KOUN_SDUS34_NVWTLX_202006010015"), b"fresh")?;

        let report = ArchiveRepair::new().repair(&ktlx(), dir.path())?;
        assert!(report.renamed.is_empty());
        assert!(matches!(
            report.warnings.as_slice(),
            [PipelineWarning::RepairSkipped { .. }]
        ));
        assert_eq!(
            fs::read(dir.path().join("KOUN_SDUS34_NVWTLX_202006010015"))?,
            b"fresh"
        );
        Ok(())
    }

    #[test]
    fn test_foreign_office_files_are_reported() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("KFWD_SDUS54_NVWFWS_202006010015"), b"x")?;

        let report = ArchiveRepair::new().repair(&ktlx(), dir.path())?;
        assert!(report.renamed.is_empty());
        assert_eq!(report.warnings.len(), 1);
        Ok(())
    }
}
