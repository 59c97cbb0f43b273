// file: src/elastic/bulk.rs
// description: chunked concurrent bulk indexing over the _bulk API
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/docs-bulk.html

use crate::elastic::client::ElasticClient;
use crate::error::Result;
use crate::ingest::progress::ProgressTracker;
use crate::utils::validation::Validator;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

const ERROR_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "index", alias = "create")]
    pub result: BulkItemResult,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemResult {
    pub status: u16,
    pub error: Option<Value>,
}

impl BulkItemResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

impl BulkResponse {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn first_error(&self) -> Option<&Value> {
        self.items.iter().find_map(|i| i.result.error.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub requests: usize,
}

/// Encodes documents as `_bulk` index actions, one action/source pair per document.
pub fn encode_actions(index: &str, documents: &[Value]) -> Result<String> {
    let action = serde_json::to_string(&json!({ "index": { "_index": index } }))?;
    let mut body = String::new();
    for document in documents {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }
    Ok(body)
}

pub struct BulkLoader<'a> {
    client: &'a ElasticClient,
    index: String,
    workers: usize,
    chunk_size: usize,
}

impl<'a> BulkLoader<'a> {
    pub fn new(client: &'a ElasticClient, index: &str, workers: usize, chunk_size: usize) -> Self {
        Self {
            client,
            index: index.to_string(),
            workers: workers.max(1),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Sends the documents in `chunk_size` batches with up to `workers` requests
    /// in flight. A failed request aborts the load; per-document rejections are
    /// counted in the outcome.
    pub async fn load(
        &self,
        documents: Vec<Value>,
        progress: Option<&ProgressTracker>,
    ) -> Result<BulkOutcome> {
        let chunks: Vec<Vec<Value>> = documents
            .chunks(self.chunk_size)
            .map(<[Value]>::to_vec)
            .collect();

        let mut responses = stream::iter(chunks.into_iter().map(|chunk| async move {
            let body = encode_actions(&self.index, &chunk)?;
            let response = self.client.bulk(body).await?;
            Ok::<_, crate::error::ServiceError>(response)
        }))
        .buffer_unordered(self.workers);

        let mut outcome = BulkOutcome::default();

        while let Some(result) = responses.next().await {
            let response = result?;
            let succeeded = response.succeeded();
            let failed = response.failed();

            outcome.requests += 1;
            outcome.succeeded += succeeded;
            outcome.failed += failed;

            debug!(
                "Bulk request to '{}' took {}ms: {} indexed, {} rejected",
                self.index, response.took, succeeded, failed
            );

            if let Some(error) = response.first_error() {
                warn!(
                    "Bulk item rejected by '{}': {}",
                    self.index,
                    Validator::truncate_text(&error.to_string(), ERROR_PREVIEW_CHARS)
                );
            }

            if let Some(progress) = progress {
                progress.add_indexed(succeeded as u64);
                progress.add_failed(failed as u64);
            }
        }

        Ok(outcome)
    }
}
