pub mod orchestrator;

pub use orchestrator::{PipelineOrchestrator, RunMode, RunOutcome, RunRequest, RunSummary};
