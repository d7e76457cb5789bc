pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{working_dir_name, zip_path_for};
pub use progress::ProgressReporter;
