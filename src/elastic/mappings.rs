// file: src/elastic/mappings.rs
// description: index mappings for the raw and inference-enriched property indices
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/semantic-text.html

use serde_json::{Map, Value, json};

/// Field names shared by the indexed property documents and the search template.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const ANNUAL_TAX: &str = "annual-tax";
    pub const MAINTENANCE_FEE: &str = "maintenance-fee";
    pub const BATHROOMS: &str = "number-of-bathrooms";
    pub const BEDROOMS: &str = "number-of-bedrooms";
    pub const SQUARE_FOOTAGE: &str = "square-footage";
    pub const HOME_PRICE: &str = "home-price";
    pub const FEATURES: &str = "property-features";
    pub const LOCATION: &str = "location";
    pub const BODY_CONTENT: &str = "body_content";
    pub const BODY_CONTENT_PHRASE: &str = "body_content_phrase";
    pub const BODY_CONTENT_SEMANTIC: &str = "body_content_semantic";
}

fn property_fields() -> Map<String, Value> {
    let properties = json!({
        "additional_urls": {"type": "keyword"},
        "annual-tax": {"type": "integer"},
        "body_content_phrase": {"type": "text"},
        "domains": {"type": "keyword"},
        "full_html": {"type": "text", "index": false},
        "geo_point": {
            "properties": {
                "lat": {"type": "float"},
                "lon": {"type": "float"}
            }
        },
        "location": {"type": "geo_point"},
        "headings": {"type": "text"},
        "home-price": {"type": "integer"},
        "id": {"type": "keyword"},
        "last_crawled_at": {"type": "date"},
        "latitude": {"type": "float"},
        "links": {"type": "keyword"},
        "listing-agent-info": {"type": "text"},
        "longitude": {"type": "float"},
        "maintenance-fee": {"type": "integer"},
        "meta_description": {"type": "text"},
        "meta_keywords": {"type": "keyword"},
        "number-of-bathrooms": {"type": "float"},
        "number-of-bedrooms": {"type": "float"},
        "property-description": {"type": "text"},
        "property-features": {"type": "text"},
        "property-status": {"type": "keyword"},
        "square-footage": {"type": "float"},
        "title": {"type": "text"},
        "url": {"type": "keyword"},
        "url_host": {"type": "keyword"},
        "url_path": {"type": "keyword"},
        "url_path_dir1": {"type": "keyword"},
        "url_path_dir2": {"type": "keyword"},
        "url_path_dir3": {"type": "keyword"},
        "url_port": {"type": "keyword"},
        "url_scheme": {"type": "keyword"}
    });

    match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn wrap(properties: Map<String, Value>) -> Value {
    json!({
        "mappings": {
            "dynamic": "false",
            "properties": properties
        }
    })
}

/// Landing index for the downloaded documents; no inference.
pub fn raw_index_mapping() -> Value {
    let mut properties = property_fields();
    properties.insert(
        fields::BODY_CONTENT.to_string(),
        json!({
            "type": "text",
            "copy_to": [fields::BODY_CONTENT_PHRASE]
        }),
    );
    wrap(properties)
}

/// Searchable index: `body_content` is copied into a `semantic_text` field
/// backed by the given inference endpoint.
pub fn properties_index_mapping(inference_id: &str) -> Value {
    let mut properties = property_fields();
    properties.insert(
        fields::BODY_CONTENT.to_string(),
        json!({
            "type": "text",
            "copy_to": [fields::BODY_CONTENT_SEMANTIC]
        }),
    );
    properties.insert(
        fields::BODY_CONTENT_SEMANTIC.to_string(),
        json!({
            "type": "semantic_text",
            "inference_id": inference_id,
            "model_settings": {
                "task_type": "sparse_embedding"
            }
        }),
    );
    wrap(properties)
}
