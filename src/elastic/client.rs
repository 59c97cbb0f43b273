// file: src/elastic/client.rs
// description: Elasticsearch REST client wrapper with authentication and error mapping
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/rest-apis.html

use crate::config::{ElasticsearchConfig, EsAuth};
use crate::elastic::bulk::BulkResponse;
use crate::elastic::reindex::TaskStatus;
use crate::error::{Result, ServiceError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    pub cluster_name: String,
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterVersion {
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredScript {
    pub lang: String,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct GetScriptResponse {
    #[serde(default)]
    found: bool,
    script: Option<StoredScript>,
}

#[derive(Debug, Deserialize)]
struct ReindexStarted {
    task: String,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Clone)]
pub struct ElasticClient {
    client: Client,
    base_url: Url,
    auth: EsAuth,
}

impl ElasticClient {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self> {
        let auth = config.auth()?;
        let base_url = parse_base_url(&config.url)?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(path) = config.ca_cert_path() {
            let pem = std::fs::read(path).map_err(|e| {
                ServiceError::Config(format!(
                    "Failed to read CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let certificate = Certificate::from_pem(&pem)?;
            builder = builder.add_root_certificate(certificate);
        }

        if config.insecure {
            warn!("TLS certificate verification is disabled for Elasticsearch");
            builder = builder.danger_accept_invalid_certs(true);
        }

        info!("Elasticsearch endpoint: {}", base_url);

        Ok(Self {
            client: builder.build()?,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path.trim_start_matches('/')).map_err(|e| {
            ServiceError::Config(format!("Invalid Elasticsearch path {}: {}", path, e))
        })?;

        let builder = self.client.request(method, url);
        Ok(match &self.auth {
            EsAuth::None => builder,
            EsAuth::ApiKey(key) => builder.header("Authorization", format!("ApiKey {}", key)),
            EsAuth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let response = error_for_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn info(&self) -> Result<ClusterInfo> {
        debug!("Checking Elasticsearch connection");
        let info: ClusterInfo = self.send(self.request(Method::GET, "")?).await?;
        info!(
            "Connected to cluster {} (Elasticsearch {})",
            info.cluster_name, info.version.number
        );
        Ok(info)
    }

    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.request(Method::HEAD, index)?.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(error_for_status(response).await.err().unwrap_or_else(|| {
                ServiceError::Validation(format!("Unexpected response checking {}", index))
            })),
        }
    }

    pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let _: Value = self
            .send(self.request(Method::PUT, index)?.json(body))
            .await?;
        info!("Index '{}' created", index);
        Ok(())
    }

    pub async fn delete_index(&self, index: &str) -> Result<()> {
        let _: Value = self.send(self.request(Method::DELETE, index)?).await?;
        info!("Index '{}' deleted", index);
        Ok(())
    }

    /// Drops the index when present and creates it again with `body`.
    pub async fn recreate_index(&self, index: &str, body: &Value) -> Result<()> {
        if self.index_exists(index).await? {
            self.delete_index(index).await?;
        }
        self.create_index(index, body).await
    }

    pub async fn count(&self, index: &str) -> Result<u64> {
        let response: CountResponse = self
            .send(self.request(Method::GET, &format!("{}/_count", index))?)
            .await?;
        Ok(response.count)
    }

    /// Makes every document written so far visible to search and `_reindex`.
    pub async fn refresh(&self, index: &str) -> Result<()> {
        let _: Value = self
            .send(self.request(Method::POST, &format!("{}/_refresh", index))?)
            .await?;
        debug!("Index '{}' refreshed", index);
        Ok(())
    }

    pub async fn put_script(&self, id: &str, source: &str) -> Result<()> {
        let body = json!({
            "script": {
                "lang": "mustache",
                "source": source
            }
        });
        let _: Value = self
            .send(
                self.request(Method::PUT, &format!("_scripts/{}", id))?
                    .json(&body),
            )
            .await?;
        info!("Created search template: {}", id);
        Ok(())
    }

    pub async fn get_script(&self, id: &str) -> Result<StoredScript> {
        let response: GetScriptResponse = self
            .send(self.request(Method::GET, &format!("_scripts/{}", id))?)
            .await?;

        match response.script {
            Some(script) if response.found => Ok(script),
            _ => Err(ServiceError::Elasticsearch {
                status: StatusCode::NOT_FOUND,
                error_type: "resource_not_found_exception".to_string(),
                reason: format!("stored script [{}] does not exist", id),
            }),
        }
    }

    /// Returns `false` when there was no script to delete.
    pub async fn delete_script(&self, id: &str) -> Result<bool> {
        let result: Result<Value> = self
            .send(self.request(Method::DELETE, &format!("_scripts/{}", id))?)
            .await;

        match result {
            Ok(_) => {
                info!("Deleted existing search template: {}", id);
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                info!("Search template '{}' not found, skipping delete", id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn search_template(
        &self,
        index: &str,
        template_id: &str,
        params: &Map<String, Value>,
    ) -> Result<Value> {
        let body = json!({ "id": template_id, "params": params });
        self.send(
            self.request(Method::POST, &format!("{}/_search/template", index))?
                .json(&body),
        )
        .await
    }

    /// Server-side rendering of a stored template, without executing it.
    pub async fn render_template(
        &self,
        template_id: &str,
        params: &Map<String, Value>,
    ) -> Result<Value> {
        let body = json!({ "id": template_id, "params": params });
        let mut response: Value = self
            .send(self.request(Method::POST, "_render/template")?.json(&body))
            .await?;
        Ok(response
            .get_mut("template_output")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    pub async fn bulk(&self, ndjson: String) -> Result<BulkResponse> {
        self.send(
            self.request(Method::POST, "_bulk")?
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(ndjson),
        )
        .await
    }

    /// Starts a reindex task and returns its id without waiting for completion.
    pub async fn start_reindex(&self, source: &str, dest: &str) -> Result<String> {
        let body = json!({
            "source": { "index": source },
            "dest": { "index": dest }
        });
        let started: ReindexStarted = self
            .send(
                self.request(Method::POST, "_reindex?wait_for_completion=false")?
                    .json(&body),
            )
            .await?;
        Ok(started.task)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskStatus> {
        self.send(self.request(Method::GET, &format!("_tasks/{}", task_id))?)
            .await
    }

    pub async fn infer(&self, inference_id: &str, input: &[&str]) -> Result<Value> {
        let body = json!({ "input": input });
        self.send(
            self.request(Method::POST, &format!("_inference/{}", inference_id))?
                .json(&body),
        )
        .await
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| ServiceError::Config(format!("Invalid Elasticsearch URL {}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ServiceError::Config(format!(
            "Unsupported Elasticsearch URL scheme: {}",
            scheme
        ))),
    }
}

async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(parse_error(status, &body))
}

/// Maps an Elasticsearch error body onto [`ServiceError::Elasticsearch`].
/// The `error` member is either an object with `type`/`reason` or a bare string.
pub(crate) fn parse_error(status: StatusCode, body: &str) -> ServiceError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let (error_type, reason) = match error {
        Some(Value::Object(obj)) => (
            obj.get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            obj.get("reason")
                .and_then(Value::as_str)
                .unwrap_or(body)
                .to_string(),
        ),
        Some(Value::String(reason)) => ("error".to_string(), reason.clone()),
        _ => {
            let reason = if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                body.to_string()
            };
            ("http_error".to_string(), reason)
        }
    };

    ServiceError::Elasticsearch {
        status,
        error_type,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ElasticClient {
        let mut config = Config::default_config().elasticsearch;
        config.url = server.uri();
        config.api_key = Some("secret".to_string());
        ElasticClient::new(&config).unwrap()
    }

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("https://es.example.com:443/prefix").unwrap();
        assert_eq!(url.as_str(), "https://es.example.com/prefix/");
        assert!(parse_base_url("ftp://es.example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_error_object_and_string() {
        let err = parse_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"type":"parsing_exception","reason":"unknown query"},"status":400}"#,
        );
        match err {
            ServiceError::Elasticsearch {
                error_type, reason, ..
            } => {
                assert_eq!(error_type, "parsing_exception");
                assert_eq!(reason, "unknown query");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = parse_error(StatusCode::FORBIDDEN, r#"{"error":"forbidden"}"#);
        assert!(err.to_string().contains("forbidden"));

        let err = parse_error(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_api_key_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("Authorization", "ApiKey secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "node-1",
                "cluster_name": "homes",
                "version": { "number": "8.17.0" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = client_for(&server).info().await.unwrap();
        assert_eq!(info.cluster_name, "homes");
        assert_eq!(info.version.number, "8.17.0");
    }

    #[tokio::test]
    async fn test_recreate_index_deletes_existing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/properties"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/properties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/properties"))
            .and(body_json(json!({"mappings": {}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .recreate_index("properties", &json!({"mappings": {}}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_posts_to_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/properties_raw/_refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_shards": {"total": 2, "successful": 1, "failed": 0}
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).refresh("properties_raw").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_script_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/_scripts/properties-search-template"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "type": "resource_not_found_exception",
                    "reason": "stored script [properties-search-template] does not exist"
                },
                "status": 404
            })))
            .mount(&server)
            .await;

        let deleted = client_for(&server)
            .delete_script("properties-search-template")
            .await
            .unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_get_script_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_scripts/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"_id": "missing", "found": false})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).get_script("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_start_reindex_returns_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_reindex"))
            .and(query_param("wait_for_completion", "false"))
            .and(body_json(json!({
                "source": { "index": "properties_raw" },
                "dest": { "index": "properties" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task": "node:42"})))
            .mount(&server)
            .await;

        let task = client_for(&server)
            .start_reindex("properties_raw", "properties")
            .await
            .unwrap();
        assert_eq!(task, "node:42");
    }

    #[tokio::test]
    async fn test_auth_failure_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "type": "security_exception", "reason": "missing authentication credentials" },
                "status": 401
            })))
            .mount(&server)
            .await;

        match client_for(&server).info().await.unwrap_err() {
            ServiceError::Elasticsearch {
                status, error_type, ..
            } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(error_type, "security_exception");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
