pub mod settings;

pub use settings::{RendererSettings, Settings};
