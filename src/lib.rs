// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns

pub mod config;
pub mod elastic;
pub mod error;
pub mod geocode;
pub mod ingest;
pub mod mcp;
pub mod search;
pub mod utils;

pub use config::{AuthMode, Config, ElasticsearchConfig, GeocodingConfig, IngestConfig, ServerConfig};
pub use elastic::{BulkLoader, ClusterInfo, ElasticClient, ReindexTracker};
pub use error::{Result, ServiceError};
pub use geocode::{GeoPoint, GeocodeFailure, GeocodeResult, GeocodingClient};
pub use ingest::{IngestMode, IngestOptions, IngestOrchestrator, IngestStats, ProgressTracker};
pub use mcp::{InferenceWarmup, PropertySearchMcp};
pub use search::{PropertySearch, PropertySummary, SearchOutcome, SearchRequest};
pub use utils::Validator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert!(!search::properties_search_template().is_empty());
    }
}
