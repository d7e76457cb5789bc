pub mod canonical;
pub mod entry;
pub mod registry;
pub mod station;
pub mod warning;
pub mod wind;
pub mod window;

pub use canonical::{canonical_name, canonical_name_for, list_canonical_files, CanonicalFile};
pub use entry::CatalogEntry;
pub use registry::{StationEntry, StationRegistry};
pub use station::{RadarCategory, Station};
pub use warning::PipelineWarning;
pub use wind::{StormMotion, WindVector};
pub use window::TimeWindow;
