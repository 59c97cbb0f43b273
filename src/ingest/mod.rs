// file: src/ingest/mod.rs
// description: property dataset ingestion module exports
// reference: internal module structure

pub mod download;
pub mod orchestrator;
pub mod progress;

pub use download::{DatasetDownloader, parse_documents, read_documents};
pub use orchestrator::{IngestMode, IngestOptions, IngestOrchestrator};
pub use progress::{IngestStats, ProgressTracker};
