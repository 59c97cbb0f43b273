// file: src/mcp/warmup.rs
// description: background keep-alive for the ELSER inference endpoint while the server runs
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/post-inference-api.html

use crate::elastic::ElasticClient;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

const WAKE_UP_INPUT: &str = "wake up";

/// Periodically sends a tiny inference request so the endpoint's allocation
/// stays warm. Dropping the guard stops the loop.
pub struct InferenceWarmup {
    handle: JoinHandle<()>,
}

impl InferenceWarmup {
    pub fn spawn(client: ElasticClient, inference_id: String, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            // The first tick completes immediately.
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                check_inference_endpoint(&client, &inference_id).await;
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for InferenceWarmup {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Returns whether the endpoint answered.
pub async fn check_inference_endpoint(client: &ElasticClient, inference_id: &str) -> bool {
    info!("Checking inference endpoint: {}", inference_id);
    match client.infer(inference_id, &[WAKE_UP_INPUT]).await {
        Ok(_) => {
            info!("Inference endpoint is ready: {}", inference_id);
            true
        }
        Err(e) => {
            error!("Inference endpoint {} is not available: {}", inference_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ElasticClient {
        let mut config = Config::default_config().elasticsearch;
        config.url = server.uri();
        ElasticClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_check_reports_availability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_inference/.elser-2-elasticsearch"))
            .and(body_json(json!({"input": ["wake up"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sparse_embedding": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(check_inference_endpoint(&client, ".elser-2-elasticsearch").await);
        assert!(!check_inference_endpoint(&client, "missing-endpoint").await);
    }

    #[tokio::test]
    async fn test_warmup_pings_repeatedly_until_stopped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_inference/.elser-2-elasticsearch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let warmup = InferenceWarmup::spawn(
            client_for(&server),
            ".elser-2-elasticsearch".to_string(),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        warmup.stop();

        let calls = server.received_requests().await.unwrap_or_default().len();
        assert!(calls >= 2, "expected repeated pings, saw {calls}");
    }
}
