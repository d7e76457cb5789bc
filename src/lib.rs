pub mod archive;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod render;
pub mod utils;

pub use error::{PipelineError, Result};
