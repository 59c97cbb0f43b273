// file: src/ingest/orchestrator.rs
// description: coordinates index provisioning, dataset loading, reindexing and template registration
// reference: orchestrates asynchronous ingestion workflow

use crate::config::Config;
use crate::elastic::mappings::{properties_index_mapping, raw_index_mapping};
use crate::elastic::{BulkLoader, ElasticClient, ReindexResult, ReindexTracker};
use crate::error::{Result, ServiceError};
use crate::ingest::download::{DatasetDownloader, read_documents};
use crate::ingest::progress::{IngestStats, ProgressTracker};
use crate::search::PropertySearch;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Provision indices, load the dataset, reindex and register the template.
    #[default]
    Full,
    /// Only (re)register the search template.
    TemplateOnly,
    /// Reindex an already loaded raw index into the processed index.
    ReindexOnly,
}

impl FromStr for IngestMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "full" => Ok(IngestMode::Full),
            "template-only" | "template_only" | "template" => Ok(IngestMode::TemplateOnly),
            "reindex-only" | "reindex_only" | "reindex" => Ok(IngestMode::ReindexOnly),
            other => Err(format!(
                "unknown ingest mode '{}' (expected full, template-only or reindex-only)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub mode: IngestMode,
    pub limit: Option<usize>,
    pub dataset_url: Option<String>,
    pub refresh: bool,
    /// Load straight into the processed index and skip the raw index.
    pub direct: bool,
    pub keep_raw: bool,
}

pub struct IngestOrchestrator {
    config: Config,
    client: ElasticClient,
    search: PropertySearch,
    show_progress: bool,
    colored: bool,
}

impl IngestOrchestrator {
    pub fn new(config: Config) -> Result<Self> {
        let client = ElasticClient::new(&config.elasticsearch)?;
        let search = PropertySearch::new(client.clone(), &config.elasticsearch);

        Ok(Self {
            config,
            client,
            search,
            show_progress: true,
            colored: true,
        })
    }

    pub fn with_progress(mut self, show_progress: bool, colored: bool) -> Self {
        self.show_progress = show_progress;
        self.colored = colored;
        self
    }

    pub async fn run(&self, options: &IngestOptions) -> Result<IngestStats> {
        let started = Instant::now();
        self.client.info().await?;

        let mut stats = match options.mode {
            IngestMode::TemplateOnly => {
                self.search.register_template().await?;
                IngestStats::new()
            }
            IngestMode::ReindexOnly => self.reindex_only(options).await?,
            IngestMode::Full => self.full(options).await?,
        };

        stats.duration_secs = started.elapsed().as_secs();
        self.log_final_stats(options.mode, &stats);
        Ok(stats)
    }

    async fn full(&self, options: &IngestOptions) -> Result<IngestStats> {
        let es = &self.config.elasticsearch;
        let target = if options.direct { &es.index } else { &es.raw_index };

        if !options.direct {
            self.client
                .recreate_index(&es.raw_index, &raw_index_mapping())
                .await?;
        }
        self.client
            .recreate_index(&es.index, &properties_index_mapping(&es.inference_id))
            .await?;

        let url = options
            .dataset_url
            .as_deref()
            .unwrap_or(&self.config.ingest.dataset_url);
        let downloader = DatasetDownloader::new(self.config.ingest.data_dir.clone());
        let path = downloader.fetch(url, options.refresh).await?;
        let documents = read_documents(&path, options.limit).await?;

        let mut stats = IngestStats::new();
        stats.documents_read = documents.len() as u64;

        if documents.is_empty() {
            warn!("Dataset {} contains no documents", path.display());
        } else {
            info!("Loading {} documents into '{}'", documents.len(), target);
            let progress = self.progress(documents.len());
            let loader = BulkLoader::new(
                &self.client,
                target,
                self.config.ingest.workers,
                self.config.ingest.chunk_size,
            );
            let outcome = loader.load(documents, Some(&progress)).await?;
            progress.finish();

            let tracked = progress.get_stats();
            debug!(
                "Bulk load took {}s ({:.1} docs/sec)",
                tracked.duration_secs,
                tracked.documents_per_second()
            );

            stats.documents_indexed = outcome.succeeded as u64;
            stats.documents_failed = outcome.failed as u64;
            info!(
                "Successfully indexed {} documents into '{}' with {} bulk requests",
                outcome.succeeded, target, outcome.requests
            );
        }

        if !options.direct {
            let result = self.reindex().await?;
            stats.documents_reindexed = result.created + result.updated;
            self.cleanup(options).await?;
        }

        self.search.register_template().await?;
        Ok(stats)
    }

    async fn reindex_only(&self, options: &IngestOptions) -> Result<IngestStats> {
        let es = &self.config.elasticsearch;
        if !self.client.index_exists(&es.raw_index).await? {
            return Err(ServiceError::Reindex(format!(
                "raw index '{}' does not exist; run a full ingest first",
                es.raw_index
            )));
        }

        self.client
            .recreate_index(&es.index, &properties_index_mapping(&es.inference_id))
            .await?;

        let result = self.reindex().await?;
        self.cleanup(options).await?;

        let mut stats = IngestStats::new();
        stats.documents_reindexed = result.created + result.updated;
        Ok(stats)
    }

    async fn reindex(&self) -> Result<ReindexResult> {
        let es = &self.config.elasticsearch;
        self.client.refresh(&es.raw_index).await?;

        let tracker = ReindexTracker::new(
            &self.client,
            Duration::from_secs(self.config.ingest.poll_interval_secs),
            self.config.ingest.max_poll_failures,
        );
        tracker.run(&es.raw_index, &es.index).await
    }

    async fn cleanup(&self, options: &IngestOptions) -> Result<()> {
        let raw_index = &self.config.elasticsearch.raw_index;
        if options.keep_raw || self.config.ingest.keep_raw_index {
            info!("Keeping raw index '{}'", raw_index);
            return Ok(());
        }

        if self.client.index_exists(raw_index).await? {
            self.client.delete_index(raw_index).await?;
        }
        Ok(())
    }

    fn progress(&self, total: usize) -> ProgressTracker {
        if self.show_progress {
            ProgressTracker::with_color(total, self.colored)
        } else {
            ProgressTracker::hidden(total)
        }
    }

    fn log_final_stats(&self, mode: IngestMode, stats: &IngestStats) {
        info!("=== Ingestion Summary ({:?}) ===", mode);
        info!("Duration: {} seconds", stats.duration_secs);
        info!("Documents read: {}", stats.documents_read);
        info!("Documents indexed: {}", stats.documents_indexed);
        info!("Documents failed: {}", stats.documents_failed);
        info!("Documents reindexed: {}", stats.documents_reindexed);
        if stats.documents_indexed + stats.documents_failed > 0 {
            info!("Success rate: {:.2}%", stats.success_rate());
            info!(
                "Indexing speed: {:.2} docs/sec",
                stats.documents_per_second()
            );
        }
        info!("================================");
    }
}
