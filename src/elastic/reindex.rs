// file: src/elastic/reindex.rs
// description: asynchronous reindex-with-inference and task polling with retry
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/tasks.html

use crate::elastic::client::ElasticClient;
use crate::error::{Result, ServiceError};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub completed: bool,
    pub task: Option<TaskInfo>,
    pub response: Option<ReindexResult>,
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TaskInfo {
    pub status: Option<ReindexProgress>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReindexProgress {
    pub total: u64,
    pub created: u64,
    pub updated: u64,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReindexResult {
    pub took: u64,
    pub total: u64,
    pub created: u64,
    pub updated: u64,
    pub timed_out: bool,
    pub failures: Vec<Value>,
}

impl TaskStatus {
    fn progress(&self) -> Option<&ReindexProgress> {
        self.task.as_ref().and_then(|t| t.status.as_ref())
    }
}

pub struct ReindexTracker<'a> {
    client: &'a ElasticClient,
    poll_interval: Duration,
    max_poll_failures: u32,
}

impl<'a> ReindexTracker<'a> {
    pub fn new(client: &'a ElasticClient, poll_interval: Duration, max_poll_failures: u32) -> Self {
        Self {
            client,
            poll_interval,
            max_poll_failures,
        }
    }

    pub async fn run(&self, source: &str, dest: &str) -> Result<ReindexResult> {
        let task_id = self.client.start_reindex(source, dest).await?;
        info!(
            "Reindex '{}' -> '{}' started. Task ID: {}",
            source, dest, task_id
        );
        self.wait(&task_id).await
    }

    /// Polls the task until it completes. Consecutive polling errors beyond
    /// `max_poll_failures` abort the wait; a successful poll resets the count.
    pub async fn wait(&self, task_id: &str) -> Result<ReindexResult> {
        let started = Instant::now();
        let mut consecutive_failures = 0u32;

        loop {
            match self.client.get_task(task_id).await {
                Ok(status) => {
                    consecutive_failures = 0;

                    if status.completed {
                        return finish(task_id, status);
                    }

                    match status.progress() {
                        Some(progress) => info!(
                            "Reindex in progress ({}/{} docs, {}s elapsed), checking again in {}s",
                            progress.created + progress.updated,
                            progress.total,
                            started.elapsed().as_secs(),
                            self.poll_interval.as_secs()
                        ),
                        None => info!(
                            "Reindex in progress, checking again in {}s",
                            self.poll_interval.as_secs()
                        ),
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        "Failed to poll task {} ({}/{}): {}",
                        task_id, consecutive_failures, self.max_poll_failures, e
                    );
                    if consecutive_failures > self.max_poll_failures {
                        return Err(ServiceError::Reindex(format!(
                            "gave up polling task {} after {} consecutive failures: {}",
                            task_id, consecutive_failures, e
                        )));
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn finish(task_id: &str, status: TaskStatus) -> Result<ReindexResult> {
    if let Some(error) = status.error {
        return Err(ServiceError::Reindex(format!(
            "task {} failed: {}",
            task_id, error
        )));
    }

    let result = status.response.unwrap_or_default();
    if !result.failures.is_empty() {
        warn!(
            "Reindex finished with {} failed documents; first failure: {}",
            result.failures.len(),
            result.failures[0]
        );
    }
    info!(
        "Reindex complete! {} docs reindexed, took {}ms",
        result.created, result.took
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ElasticClient {
        let mut config = Config::default_config().elasticsearch;
        config.url = server.uri();
        ElasticClient::new(&config).unwrap()
    }

    fn in_progress() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "completed": false,
            "task": { "status": { "total": 100, "created": 40, "updated": 0 } }
        }))
    }

    fn done() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "completed": true,
            "task": { "status": { "total": 100, "created": 100 } },
            "response": { "took": 1234, "total": 100, "created": 100, "failures": [] }
        }))
    }

    #[tokio::test]
    async fn test_wait_polls_until_complete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_tasks/node:1"))
            .respond_with(in_progress())
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/_tasks/node:1"))
            .respond_with(done())
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = ReindexTracker::new(&client, Duration::from_millis(5), 3)
            .wait("node:1")
            .await
            .unwrap();
        assert_eq!(result.created, 100);
        assert_eq!(result.took, 1234);
    }

    #[tokio::test]
    async fn test_transient_poll_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_tasks/node:2"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/_tasks/node:2"))
            .respond_with(done())
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = ReindexTracker::new(&client, Duration::from_millis(5), 2)
            .wait("node:2")
            .await
            .unwrap();
        assert_eq!(result.created, 100);
    }

    #[tokio::test]
    async fn test_persistent_poll_errors_abort() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_tasks/node:3"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ReindexTracker::new(&client, Duration::from_millis(5), 2)
            .wait("node:3")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Reindex(_)));
    }

    #[tokio::test]
    async fn test_task_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_tasks/node:4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "completed": true,
                "error": { "type": "inference_exception", "reason": "model not deployed" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ReindexTracker::new(&client, Duration::from_millis(5), 2)
            .wait("node:4")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model not deployed"));
    }
}
