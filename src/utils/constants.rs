/// Remote service defaults
pub const DEFAULT_BASE_URL: &str = "https://thredds.ucar.edu/thredds";
pub const DEFAULT_USER_AGENT: &str = concat!("vwp-fetcher/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Catalog layout
pub const LEVEL3_DIR: &str = "level3";
pub const PRODUCT_DIR: &str = "NVW";
pub const CATALOG_FILE: &str = "catalog.html";
pub const FILE_SERVER_DIR: &str = "fileServer";
pub const RAW_EXTENSION: &str = "nids";

/// Canonical product naming
pub const WMO_HEADER: &str = "SDUS34";
pub const WMO_HEADER_CODE: &str = "34";
pub const PRODUCT_TAG: &str = "NVW";
pub const WFO_MARKER_PREFIX: char = 'K';

/// Working directory layout
pub const WORKDIR_PREFIX: &str = "data_";
pub const PLOTS_DIR: &str = "plots";
pub const ZIP_EXTENSION: &str = "zip";
pub const DEFAULT_SETTINGS_FILE: &str = "vwp-fetcher.toml";
pub const ENV_PREFIX: &str = "VWP_FETCHER";

/// Scan windows
pub const TRAILING_SCAN_DAYS: i64 = 1;
pub const OLDEST_SCAN_FROM_DAYS: i64 = 31;
pub const OLDEST_SCAN_TO_DAYS: i64 = 29;
pub const LATEST_SCAN_DAYS: i64 = 1;

/// Processing defaults
pub const DEFAULT_SCAN_WORKERS: usize = 4;
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 4;
pub const MAX_WORKERS: usize = 32;

/// Input formats
pub const WINDOW_TIME_FORMAT: &str = "%Y%m%d/%H";
pub const FRAME_STAMP_FORMAT: &str = "%Y%m%d%H%M";
