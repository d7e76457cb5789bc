pub mod retrieval;
pub mod scanner;

pub use retrieval::{FetchReport, RetrievalManager, TransferOutcome};
pub use scanner::{Availability, CatalogScanner, ScanReport};
