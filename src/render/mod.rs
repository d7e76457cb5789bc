//! Plot rendering.
//!
//! The pipeline hands a directory of canonical files to a [`Renderer`] and
//! collects the images it produces. Rendering problems never abort a run;
//! the orchestrator records them as warnings.

pub mod command;

pub use command::CommandRenderer;

use crate::error::{PipelineError, Result};
use crate::models::{CanonicalFile, Station, StormMotion, WindVector};
use std::path::PathBuf;

/// Everything a renderer needs to plot one station's profiles.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub station: Station,
    /// Directory holding the canonical files
    pub data_dir: PathBuf,
    /// Directory the renderer writes its images into
    pub output_dir: PathBuf,
    pub storm_motion: StormMotion,
    pub surface_wind: Option<WindVector>,
}

impl RenderRequest {
    /// `{output_dir}/{station}_vad.png`
    pub fn hodograph_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_vad.png", self.station.id))
    }

    /// `{output_dir}/{station}_vwp.png`
    pub fn time_height_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_vwp.png", self.station.id))
    }
}

pub trait Renderer: Send + Sync {
    /// Plot a single-frame hodograph, returning the image path.
    fn render_hodograph(&self, request: &RenderRequest, frame: &CanonicalFile) -> Result<PathBuf>;

    /// Plot the multi-frame time-height composite, returning the image path.
    fn render_time_height(&self, request: &RenderRequest) -> Result<PathBuf>;
}

/// Used when no plotting programs are configured. Every call fails, so the
/// run reports the missing plots and still packages the data.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRenderer;

impl Renderer for DisabledRenderer {
    fn render_hodograph(&self, _request: &RenderRequest, _frame: &CanonicalFile) -> Result<PathBuf> {
        Err(PipelineError::Render(
            "no hodograph program configured".to_string(),
        ))
    }

    fn render_time_height(&self, _request: &RenderRequest) -> Result<PathBuf> {
        Err(PipelineError::Render(
            "no time-height program configured".to_string(),
        ))
    }
}
