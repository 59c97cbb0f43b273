// file: src/elastic/mod.rs
// description: Elasticsearch operations module exports
// reference: internal module structure

pub mod bulk;
pub mod client;
pub mod mappings;
pub mod reindex;

pub use bulk::{BulkLoader, BulkOutcome};
pub use client::{ClusterInfo, ElasticClient, StoredScript};
pub use reindex::{ReindexResult, ReindexTracker};
