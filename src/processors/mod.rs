pub mod inflation;
pub mod repair;

pub use inflation::{InflateOutcome, InflateReport, InflationAdapter};
pub use repair::{normalized_name, ArchiveRepair, RepairReport};
