use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A non-fatal problem recorded during a run. The run carries on past these;
/// they are returned to the caller instead of being swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    #[error("catalog for {day} unavailable: {reason}")]
    CatalogUnavailable { day: NaiveDate, reason: String },

    #[error("transfer of {file} failed: {reason}")]
    TransferFailed { file: String, reason: String },

    #[error("transfer of {file} incomplete: received {received} of {expected:?} bytes")]
    TransferIncomplete {
        file: String,
        expected: Option<u64>,
        received: u64,
    },

    #[error("could not decode {file}: {reason}")]
    DecodeFailed { file: String, reason: String },

    #[error("left {path:?} unrepaired: {reason}")]
    RepairSkipped { path: PathBuf, reason: String },

    #[error("rendering {target} failed: {reason}")]
    RenderFailed { target: String, reason: String },
}
