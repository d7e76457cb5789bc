use crate::error::{PipelineError, Result};
use crate::models::StationEntry;
use crate::utils::constants::{
    DEFAULT_BASE_URL, DEFAULT_DOWNLOAD_WORKERS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SCAN_WORKERS, DEFAULT_SETTINGS_FILE, DEFAULT_USER_AGENT, ENV_PREFIX,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Runtime settings, injected into each pipeline component at construction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// THREDDS root, e.g. `https://thredds.ucar.edu/thredds`
    #[validate(length(min = 1))]
    pub base_url: String,

    /// Directory under which per-run working directories are created
    pub home_dir: PathBuf,

    #[validate(range(min = 1, max = 32))]
    pub scan_workers: usize,

    #[validate(range(min = 1, max = 32))]
    pub download_workers: usize,

    #[validate(range(min = 1, max = 32))]
    pub inflate_workers: usize,

    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    #[validate(length(min = 1))]
    pub user_agent: String,

    #[serde(default)]
    pub renderer: RendererSettings,

    /// Extra or replacement registry entries keyed by site id
    #[serde(default)]
    pub stations: HashMap<String, StationEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RendererSettings {
    /// Program and leading arguments for single-frame hodographs
    #[serde(default)]
    pub hodograph_command: Vec<String>,

    /// Program and leading arguments for the time-height composite
    #[serde(default)]
    pub time_height_command: Vec<String>,

    /// Where the plotting programs drop their images; defaults to the
    /// working directory of the run
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl RendererSettings {
    pub fn is_configured(&self) -> bool {
        !self.hodograph_command.is_empty() && !self.time_height_command.is_empty()
    }
}

impl Settings {
    /// Layer defaults, the settings file and `VWP_FETCHER__*` environment
    /// variables. An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("home_dir", ".")?
            .set_default("scan_workers", DEFAULT_SCAN_WORKERS as u64)?
            .set_default("download_workers", DEFAULT_DOWNLOAD_WORKERS as u64)?
            .set_default("inflate_workers", default_inflate_workers() as u64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn with_home_dir(mut self, home_dir: PathBuf) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// HTTP client shared by the catalog scanner and the retrieval manager.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout())
            .build()
            .map_err(PipelineError::from)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            home_dir: PathBuf::from("."),
            scan_workers: DEFAULT_SCAN_WORKERS,
            download_workers: DEFAULT_DOWNLOAD_WORKERS,
            inflate_workers: default_inflate_workers(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            renderer: RendererSettings::default(),
            stations: HashMap::new(),
        }
    }
}

fn default_inflate_workers() -> usize {
    num_cpus::get().clamp(1, crate::utils::constants::MAX_WORKERS)
}
