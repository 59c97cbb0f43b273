// file: src/search/service.rs
// description: stored template discovery, registration and execution against the properties index
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/search-template-api.html

use crate::config::ElasticsearchConfig;
use crate::elastic::ElasticClient;
use crate::error::Result;
use crate::search::params::SearchRequest;
use crate::search::render::render_json;
use crate::search::results::SearchOutcome;
use crate::search::template::{
    TemplateParameter, catalog_entry, extract_placeholders, properties_search_template,
};
use crate::utils::validation::Validator;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

const LOG_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct TemplateParams {
    pub template_id: String,
    pub parameters: Vec<String>,
    pub descriptions: Vec<&'static TemplateParameter>,
}

impl TemplateParams {
    pub fn describe(&self) -> String {
        let mut lines: Vec<String> = self
            .descriptions
            .iter()
            .map(|p| format!("- {} ({}): {}", p.name, kind_label(p), p.description))
            .collect();

        for name in &self.parameters {
            if catalog_entry(name).is_none() {
                lines.push(format!("- {}: no description available", name));
            }
        }
        lines.join("\n")
    }
}

fn kind_label(parameter: &TemplateParameter) -> String {
    serde_json::to_value(parameter.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct PropertySearch {
    client: ElasticClient,
    index: String,
    template_id: String,
}

impl PropertySearch {
    pub fn new(client: ElasticClient, config: &ElasticsearchConfig) -> Self {
        Self {
            client,
            index: config.index.clone(),
            template_id: config.template_id.clone(),
        }
    }

    pub fn client(&self) -> &ElasticClient {
        &self.client
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Parameters referenced by the stored template, joined with the catalog.
    pub async fn template_params(&self) -> Result<TemplateParams> {
        let script = self.client.get_script(&self.template_id).await?;
        let parameters = extract_placeholders(&script.source);

        info!(
            "Found parameters for template {}: {}",
            self.template_id,
            parameters.join(", ")
        );

        let descriptions = parameters
            .iter()
            .filter_map(|name| catalog_entry(name))
            .collect();

        Ok(TemplateParams {
            template_id: self.template_id.clone(),
            parameters,
            descriptions,
        })
    }

    /// Replaces the stored template with the current source.
    pub async fn register_template(&self) -> Result<()> {
        self.client.delete_script(&self.template_id).await?;
        self.client
            .put_script(&self.template_id, &properties_search_template())
            .await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let params = request.to_template_params()?;

        info!(
            "Using template ID: {} for index: {}",
            self.template_id, self.index
        );
        info!(
            "Original user query: {}",
            Validator::truncate_text(&request.original_query, LOG_PREVIEW_CHARS)
        );
        let normalized = serde_json::to_string(&params)?;
        debug!("Normalized parameters: {}", normalized);

        let response = self
            .client
            .search_template(&self.index, &self.template_id, &params)
            .await?;

        let outcome = SearchOutcome::from_response(&response);
        info!("Search returned {} of {} hits", outcome.results.len(), outcome.total);
        Ok(outcome)
    }

    /// Query body as Elasticsearch renders it from the stored template.
    pub async fn render_remote(&self, request: &SearchRequest) -> Result<Value> {
        let params = request.to_template_params()?;
        self.client.render_template(&self.template_id, &params).await
    }

    /// Query body rendered locally from the built-in template source.
    pub fn render_local(request: &SearchRequest) -> Result<Value> {
        let params = request.to_template_params()?;
        render_json(&properties_search_template(), &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_for(server: &MockServer) -> PropertySearch {
        let mut config = Config::default_config().elasticsearch;
        config.url = server.uri();
        let client = ElasticClient::new(&config).unwrap();
        PropertySearch::new(client, &config)
    }

    #[tokio::test]
    async fn test_template_params_from_stored_script() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_scripts/properties-search-template"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "properties-search-template",
                "found": true,
                "script": {
                    "lang": "mustache",
                    "source": "{\"q\": \"{{query}}\"{{#bedrooms}}, \"b\": {{bedrooms}}{{/bedrooms}}, \"x\": \"{{custom}}\"}"
                }
            })))
            .mount(&server)
            .await;

        let params = search_for(&server).template_params().await.unwrap();
        assert_eq!(params.parameters, vec!["query", "bedrooms", "custom"]);
        assert_eq!(params.descriptions.len(), 2);

        let text = params.describe();
        assert!(text.contains("- query (string): Main search query (mandatory)"));
        assert!(text.contains("- custom: no description available"));
    }

    #[tokio::test]
    async fn test_template_params_missing_template() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_scripts/properties-search-template"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "_id": "properties-search-template",
                "found": false
            })))
            .mount(&server)
            .await;

        let err = search_for(&server).template_params().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_search_posts_normalized_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/properties/_search/template"))
            .and(body_partial_json(json!({
                "id": "properties-search-template",
                "params": {"query": "ranch", "distance": "20mi", "latitude": 30.0, "longitude": -97.0}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {
                    "total": {"value": 1, "relation": "eq"},
                    "hits": [{"fields": {"title": ["Hill Country ranch"]}}]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = SearchRequest {
            latitude: Some(30.0),
            longitude: Some(-97.0),
            distance: Some(20),
            ..SearchRequest::new("ranch")
        };
        let outcome = search_for(&server).search(&request).await.unwrap();
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.results[0].title, json!("Hill Country ranch"));
    }

    #[tokio::test]
    async fn test_search_logs_long_multibyte_query() {
        let _logs = tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_test_writer()
                .finish(),
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/properties/_search/template"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = SearchRequest {
            original_query: "maison près du lac à Orléans ".repeat(20),
            ..SearchRequest::new("lakefront house")
        };
        let outcome = search_for(&server).search(&request).await.unwrap();
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_request_without_calling_elasticsearch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = SearchRequest {
            distance: Some(5),
            ..SearchRequest::new("ranch")
        };
        assert!(search_for(&server).search(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_register_template_deletes_then_puts() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/_scripts/properties-search-template"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"type": "resource_not_found_exception", "reason": "not found"},
                "status": 404
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/_scripts/properties-search-template"))
            .and(body_partial_json(json!({"script": {"lang": "mustache"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        search_for(&server).register_template().await.unwrap();
    }

    #[test]
    fn test_render_local() {
        let query = PropertySearch::render_local(&SearchRequest::new("cabin")).unwrap();
        assert_eq!(query["size"], 5);
        assert_eq!(
            query["retriever"]["standard"]["query"]["semantic"]["field"],
            "body_content_semantic"
        );
    }
}
