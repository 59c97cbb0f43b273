// file: src/search/params.rs
// description: search tool arguments, validation and conversion to template params
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/search-template.html

use crate::error::{Result, ServiceError};
use crate::utils::validation::Validator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    #[schemars(description = "The user's request exactly as they phrased it")]
    pub original_query: String,

    #[schemars(description = "Main search query describing the property, without the structured filters")]
    pub query: String,

    #[schemars(description = "Geographic latitude coordinate, usually from geocode_location")]
    pub latitude: Option<f64>,

    #[schemars(description = "Geographic longitude coordinate, usually from geocode_location")]
    pub longitude: Option<f64>,

    #[schemars(description = "Search radius in miles; requires latitude and longitude")]
    pub distance: Option<u32>,

    #[schemars(description = "Maximum real estate tax amount")]
    pub tax: Option<f64>,

    #[schemars(description = "Minimum number of bedrooms")]
    pub bedrooms: Option<u32>,

    #[schemars(description = "Max home price. Not a range, just a number")]
    pub home_price: Option<f64>,

    #[schemars(description = "Minimum number of bathrooms")]
    pub bathrooms: Option<f64>,

    #[schemars(description = "Minimum property square footage")]
    pub square_footage: Option<u32>,

    #[schemars(
        description = "Home features as a single string, e.g. \"pool updated kitchen\""
    )]
    pub feature: Option<String>,

    #[schemars(description = "Maximum maintenance fee amount")]
    pub maintenance: Option<f64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            original_query: query.clone(),
            query,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        Validator::validate_not_blank("query", &self.query)?;

        if let Some(latitude) = self.latitude {
            Validator::validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.longitude {
            Validator::validate_longitude(longitude)?;
        }

        if let Some(distance) = self.distance {
            if distance == 0 {
                return Err(ServiceError::Validation(
                    "distance must be greater than 0".to_string(),
                ));
            }
            if self.latitude.is_none() || self.longitude.is_none() {
                return Err(ServiceError::Validation(
                    "distance requires both latitude and longitude".to_string(),
                ));
            }
        }

        let numeric = [
            ("tax", self.tax),
            ("home_price", self.home_price),
            ("bathrooms", self.bathrooms),
            ("maintenance", self.maintenance),
        ];
        for (name, value) in numeric {
            if let Some(value) = value {
                Validator::validate_non_negative(name, value)?;
            }
        }

        Ok(())
    }

    /// Validated parameters for the stored template. Absent values are left
    /// out so their template sections stay closed, and `distance` gains its
    /// `mi` unit.
    pub fn to_template_params(&self) -> Result<Map<String, Value>> {
        self.validate()?;

        let mut params = Map::new();
        params.insert("query".to_string(), json!(self.query.trim()));

        let mut insert = |name: &str, value: Option<Value>| {
            if let Some(value) = value {
                params.insert(name.to_string(), value);
            }
        };

        insert("latitude", self.latitude.map(|v| json!(v)));
        insert("longitude", self.longitude.map(|v| json!(v)));
        insert("distance", self.distance.map(|d| json!(format!("{}mi", d))));
        insert("tax", self.tax.map(|v| json!(v)));
        insert("bedrooms", self.bedrooms.map(|v| json!(v)));
        insert("home_price", self.home_price.map(|v| json!(v)));
        insert("bathrooms", self.bathrooms.map(|v| json!(v)));
        insert("square_footage", self.square_footage.map(|v| json!(v)));
        insert(
            "feature",
            self.feature
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(|f| json!(f)),
        );
        insert("maintenance", self.maintenance.map(|v| json!(v)));

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::render::render_json;
    use crate::search::template::properties_search_template;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent_values_are_dropped() {
        let params = SearchRequest::new("quiet cottage").to_template_params().unwrap();
        assert_eq!(Value::Object(params), json!({"query": "quiet cottage"}));
    }

    #[test]
    fn test_distance_gets_mile_unit() {
        let request = SearchRequest {
            latitude: Some(40.71),
            longitude: Some(-74.0),
            distance: Some(10),
            bedrooms: Some(2),
            feature: Some("  pool  ".to_string()),
            ..SearchRequest::new("loft")
        };

        let params = request.to_template_params().unwrap();
        assert_eq!(params["distance"], json!("10mi"));
        assert_eq!(params["bedrooms"], json!(2));
        assert_eq!(params["feature"], json!("pool"));
        assert!(!params.contains_key("tax"));
    }

    #[test]
    fn test_blank_feature_is_dropped() {
        let request = SearchRequest {
            feature: Some("   ".to_string()),
            ..SearchRequest::new("loft")
        };
        assert!(!request.to_template_params().unwrap().contains_key("feature"));
    }

    #[test]
    fn test_validation_failures() {
        assert!(SearchRequest::new("  ").validate().is_err());

        let out_of_range = SearchRequest {
            latitude: Some(91.0),
            ..SearchRequest::new("loft")
        };
        assert!(out_of_range.validate().is_err());

        let distance_without_point = SearchRequest {
            latitude: Some(40.0),
            distance: Some(5),
            ..SearchRequest::new("loft")
        };
        assert!(distance_without_point.validate().is_err());

        let zero_distance = SearchRequest {
            latitude: Some(40.0),
            longitude: Some(-74.0),
            distance: Some(0),
            ..SearchRequest::new("loft")
        };
        assert!(zero_distance.validate().is_err());

        let negative_price = SearchRequest {
            home_price: Some(-1.0),
            ..SearchRequest::new("loft")
        };
        assert!(negative_price.validate().is_err());
    }

    #[test]
    fn test_deserializes_tool_arguments() {
        let request: SearchRequest = serde_json::from_value(json!({
            "original_query": "3 bed near Miami under 500k",
            "query": "home near Miami",
            "bedrooms": 3,
            "home_price": 500000
        }))
        .unwrap();

        assert_eq!(request.bedrooms, Some(3));
        assert_eq!(request.home_price, Some(500000.0));
        assert_eq!(request.latitude, None);
    }

    #[test]
    fn test_params_render_to_valid_query() {
        let request = SearchRequest {
            latitude: Some(25.76),
            longitude: Some(-80.19),
            distance: Some(15),
            bathrooms: Some(2.0),
            maintenance: Some(400.0),
            feature: Some("pool".to_string()),
            ..SearchRequest::new("waterfront condo with \"ocean\" views")
        };

        let query = render_json(
            &properties_search_template(),
            &request.to_template_params().unwrap(),
        )
        .unwrap();

        let standard = &query["retriever"]["standard"];
        assert_eq!(
            standard["query"]["semantic"]["query"],
            "waterfront condo with \"ocean\" views"
        );
        assert_eq!(standard["filter"]["bool"]["must"].as_array().unwrap().len(), 3);
    }
}
