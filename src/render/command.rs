use crate::config::RendererSettings;
use crate::error::{PipelineError, Result};
use crate::models::{CanonicalFile, StormMotion};
use crate::render::{RenderRequest, Renderer};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Hodograph frame time as the plotting programs expect it.
const FRAME_ARG_FORMAT: &str = "%Y-%m-%d/%H%M";

/// Runs external plotting programs with an explicit argument vector.
///
/// Hodograph: `{program..} STATION -t YYYY-MM-DD/HHMM [-s DDD/SS] -m MOTION -p DATA_DIR`
/// Time-height: `{program..} STATION -p DATA_DIR`
///
/// Both run with the request's output directory as their working directory
/// and are expected to leave `{station}_vad.png` / `{station}_vwp.png` there.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    hodograph: Vec<String>,
    time_height: Vec<String>,
}

impl CommandRenderer {
    pub fn new(hodograph: Vec<String>, time_height: Vec<String>) -> Result<Self> {
        if hodograph.is_empty() || time_height.is_empty() {
            return Err(PipelineError::Config(
                "renderer commands must name a program".to_string(),
            ));
        }
        Ok(Self {
            hodograph,
            time_height,
        })
    }

    pub fn from_settings(settings: &RendererSettings) -> Result<Self> {
        Self::new(
            settings.hodograph_command.clone(),
            settings.time_height_command.clone(),
        )
    }

    pub fn hodograph_args(&self, request: &RenderRequest, frame: &CanonicalFile) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            request.station.id.clone().into(),
            "-t".into(),
            frame.valid_time.format(FRAME_ARG_FORMAT).to_string().into(),
        ];
        if let Some(wind) = request.surface_wind {
            args.push("-s".into());
            args.push(wind.to_string().into());
        }
        args.push("-m".into());
        args.push(motion_arg(&request.storm_motion).into());
        args.push("-p".into());
        args.push(request.data_dir.clone().into_os_string());
        args
    }

    pub fn time_height_args(&self, request: &RenderRequest) -> Vec<OsString> {
        vec![
            request.station.id.clone().into(),
            "-p".into(),
            request.data_dir.clone().into_os_string(),
        ]
    }
}

impl Renderer for CommandRenderer {
    fn render_hodograph(&self, request: &RenderRequest, frame: &CanonicalFile) -> Result<PathBuf> {
        let args = self.hodograph_args(request, frame);
        run_program(&self.hodograph, &args, &request.output_dir)?;
        expect_image(request.hodograph_path())
    }

    fn render_time_height(&self, request: &RenderRequest) -> Result<PathBuf> {
        let args = self.time_height_args(request);
        run_program(&self.time_height, &args, &request.output_dir)?;
        expect_image(request.time_height_path())
    }
}

/// Storm motion as the plotting programs spell it.
fn motion_arg(motion: &StormMotion) -> String {
    match motion {
        StormMotion::RightMover => "BRM".to_string(),
        StormMotion::LeftMover => "BLM".to_string(),
        StormMotion::Vector(v) => v.to_string(),
    }
}

fn run_program(command: &[String], args: &[OsString], cwd: &Path) -> Result<()> {
    let Some((program, leading)) = command.split_first() else {
        return Err(PipelineError::Config("empty renderer command".to_string()));
    };

    debug!(%program, ?leading, ?args, cwd = %cwd.display(), "Running plotting program");
    let output = Command::new(program)
        .args(leading)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| PipelineError::Render(format!("could not start {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Render(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

fn expect_image(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(PipelineError::Render(format!(
            "expected image {} was not produced",
            path.display()
        )))
    }
}
