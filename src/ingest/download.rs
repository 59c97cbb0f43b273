// file: src/ingest/download.rs
// description: property dataset download with on-disk caching and NDJSON parsing
// reference: https://docs.rs/reqwest

use crate::error::{Result, ServiceError};
use chrono::{DateTime, Local};
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub struct DatasetDownloader {
    client: Client,
    data_dir: PathBuf,
}

impl DatasetDownloader {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            data_dir,
        }
    }

    /// Local cache path for a dataset URL: the last path segment inside `data_dir`.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let file_name = url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("properties.json");
        self.data_dir.join(file_name)
    }

    /// Downloads `url` unless a cached copy exists (or `refresh` is set) and
    /// returns the local path.
    pub async fn fetch(&self, url: &str, refresh: bool) -> Result<PathBuf> {
        let target = self.cache_path(url);

        if !refresh && fs::try_exists(&target).await? {
            let downloaded = fs::metadata(&target)
                .await?
                .modified()
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            info!(
                "Using cached dataset {} (downloaded {}), pass --refresh to fetch again",
                target.display(),
                downloaded
            );
            return Ok(target);
        }

        fs::create_dir_all(&self.data_dir).await?;
        info!("Downloading dataset from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::Download(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::Download(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        // Only complete downloads are renamed into the cache.
        let partial = target.with_extension("part");
        let mut file = fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| ServiceError::Download(format!("reading body: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        fs::rename(&partial, &target).await?;
        info!("Downloaded {} bytes to {}", written, target.display());
        Ok(target)
    }
}

/// Reads one JSON document per non-empty line, stopping after `limit` documents.
pub async fn read_documents(path: &Path, limit: Option<usize>) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path).await?;
    parse_documents(&content, limit)
}

pub fn parse_documents(content: &str, limit: Option<usize>) -> Result<Vec<Value>> {
    let max = limit.unwrap_or(usize::MAX);
    let mut documents = Vec::new();

    for (line_number, line) in content.lines().enumerate() {
        if documents.len() >= max {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(document @ Value::Object(_)) => documents.push(document),
            Ok(_) => warn!("Skipping line {}: not a JSON object", line_number + 1),
            Err(e) => {
                return Err(ServiceError::Download(format!(
                    "invalid JSON on line {}: {}",
                    line_number + 1,
                    e
                )));
            }
        }
    }

    debug!("Parsed {} documents", documents.len());
    Ok(documents)
}
